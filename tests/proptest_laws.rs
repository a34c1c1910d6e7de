//! Property tests for canonical binding laws

use proptest::prelude::*;

use viewbind::{Binding, BindingParser, Segment};

fn segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        (0i64..1000).prop_map(Segment::Index),
        "[a-z][a-z0-9_]{0,6}".prop_map(Segment::Key),
    ]
}

fn segments() -> impl Strategy<Value = Vec<Segment>> {
    prop::collection::vec(segment(), 1..6)
}

fn bracketed(segments: &[Segment]) -> String {
    let mut raw = segments[0].to_string();
    for segment in &segments[1..] {
        match segment {
            Segment::Index(i) => raw.push_str(&format!("[{}]", i)),
            Segment::Key(k) => raw.push_str(&format!("['{}']", k)),
        }
    }
    raw
}

proptest! {
    #[test]
    fn dotted_form_round_trips(segs in segments()) {
        let parser = BindingParser::default();
        let joined = Binding::from_array(segs.clone()).as_str().to_string();

        let parsed = parser.parse(joined.as_str()).unwrap();
        prop_assert_eq!(parsed.as_array(), segs.as_slice());
        prop_assert_eq!(parsed.as_str(), joined.as_str());
    }

    #[test]
    fn bracket_form_matches_dotted_form(segs in segments()) {
        let parser = BindingParser::default();
        let dotted = parser.parse(Binding::from_array(segs.clone()).as_str()).unwrap();
        let bracket = parser.parse(bracketed(&segs)).unwrap();

        prop_assert!(Binding::ptr_eq(&dotted, &bracket));
    }

    #[test]
    fn prefixes_contain_their_extensions(base in segments(), rest in prop::collection::vec(segment(), 0..4)) {
        let parent = Binding::from_array(base.clone());
        let mut extended = base.clone();
        extended.extend(rest.iter().cloned());
        let child = Binding::from_array(extended);

        prop_assert!(parent.contains(&child));
        prop_assert_eq!(child.contains(&parent), rest.is_empty());
        prop_assert_eq!(child.relative(&parent), rest);
    }

    #[test]
    fn descendent_then_parent_is_identity(base in segments(), last in segment()) {
        let parser = BindingParser::default();
        let binding = parser.parse(Binding::from_array(base).as_str()).unwrap();

        let child = binding.descendent(vec![last.clone()]);
        prop_assert_eq!(child.key(), Some(&last));
        prop_assert!(Binding::ptr_eq(&child.parent(), &binding));
    }
}
