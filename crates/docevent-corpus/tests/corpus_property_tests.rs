use docevent_corpus::{gold_corpus, load_corpus, project_document, read_corpus, CorpusEntry};
use docevent_schema::{EventDecl, Schema};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::io::Write;

const ROLES: [&str; 4] = ["Pledger", "PledgedShares", "Pledgee", "StartDate"];
const TEXTS: [&str; 3] = ["张三", "银行A", "100股"];

fn schema() -> Schema {
    Schema::from_decls(vec![EventDecl::new(
        "EquityPledge",
        ["Pledger", "PledgedShares"],
        ROLES,
        [
            ("Pledger", "PledgedShares"),
            ("Pledger", "Pledgee"),
            ("Pledger", "StartDate"),
        ],
    )])
    .expect("schema")
}

/// Every text occurs once in each of two sentences.
fn corpus_json(events: &[Vec<(usize, Option<usize>)>]) -> String {
    let events: Vec<String> = events
        .iter()
        .enumerate()
        .map(|(record, args)| {
            let args: Vec<String> = args
                .iter()
                .map(|(role, text)| match text {
                    Some(t) => format!("\"{}\": \"{}\"", ROLES[*role], TEXTS[*t]),
                    None => format!("\"{}\": null", ROLES[*role]),
                })
                .collect();
            format!("[{record}, \"EquityPledge\", {{{}}}]", args.join(", "))
        })
        .collect();
    format!(
        r#"[["D", {{"sentences": ["张三银行A100股", "100股张三银行A"],
            "ann_mspan2dranges": {{
                "张三": [[0, 0, 2], [1, 4, 6]],
                "银行A": [[0, 2, 5], [1, 6, 9]],
                "100股": [[0, 5, 9], [1, 0, 4]]
            }},
            "recguid_eventname_eventdict_list": [{}]}}]]"#,
        events.join(", ")
    )
}

fn event() -> impl Strategy<Value = Vec<(usize, Option<usize>)>> {
    proptest::collection::btree_map(0..ROLES.len(), proptest::option::of(0..TEXTS.len()), 1..4)
        .prop_map(|args| args.into_iter().collect())
}

fn entry(events: &[Vec<(usize, Option<usize>)>]) -> CorpusEntry {
    read_corpus(corpus_json(events).as_bytes())
        .expect("corpus")
        .remove(0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn projection_is_one_clean_line_per_sentence(events in proptest::collection::vec(event(), 0..4)) {
        let entry = entry(&events);
        let sentences = project_document(&schema(), &entry);
        prop_assert_eq!(sentences.len(), 2);

        for (sent_id, sentence) in sentences.iter().enumerate() {
            prop_assert_eq!(sentence.sent_id, sent_id);
            prop_assert_eq!(&sentence.doc_id, "D");

            let ids: Vec<u32> = sentence.entity.iter().map(|e| e.ent_id).collect();
            let expected: Vec<u32> = (0..sentence.entity.len() as u32).collect();
            prop_assert_eq!(ids, expected);

            let offsets: BTreeSet<_> = sentence.entity.iter().map(|e| e.offset).collect();
            prop_assert_eq!(offsets.len(), sentence.entity.len());

            for relation in &sentence.relation {
                prop_assert!((relation.head() as usize) < sentence.entity.len());
                prop_assert!((relation.dependent() as usize) < sentence.entity.len());
            }
        }
    }

    #[test]
    fn gold_view_keeps_every_event(events in proptest::collection::vec(event(), 0..4)) {
        let entry = entry(&events);
        let docs = gold_corpus(std::slice::from_ref(&entry));
        prop_assert_eq!(docs.len(), 1);
        prop_assert_eq!(docs[0].event.len(), events.len());
        for (gold, args) in docs[0].event.iter().zip(&events) {
            prop_assert_eq!(gold.args.len(), args.len());
        }
    }
}

#[test]
fn loads_corpus_from_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(corpus_json(&[vec![(0, Some(0)), (1, Some(2))]]).as_bytes())
        .expect("write corpus");

    let corpus = load_corpus(file.path()).expect("load");
    assert_eq!(corpus.len(), 1);
    assert_eq!(corpus[0].document.events.len(), 1);

    let sentences = project_document(&schema(), &corpus[0]);
    let texts: Vec<&str> = sentences[1].entity.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["张三", "100股"]);
    assert_eq!(sentences[1].relation.len(), 1);
}

#[test]
fn missing_corpus_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = load_corpus(&dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("absent.json"));
}
