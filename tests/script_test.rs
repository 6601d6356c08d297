use std::path::{Path, PathBuf};

use rstest::{fixture, rstest};
use vimsyn::{
    ClusterType, ContextId, ItemKind, ScriptParserBuilder, SyntaxDefinition, SyntaxLoader,
    VimsynErrorKind,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

#[fixture]
#[once]
fn main_definition() -> SyntaxDefinition {
    init();
    ScriptParserBuilder::new()
        .verify_regexes(true)
        .build(data_dir().join("main.vim"))
        .unwrap()
        .parse()
        .unwrap()
}

fn keyword_names(definition: &SyntaxDefinition, group: &str) -> Vec<String> {
    definition
        .group(group)
        .map(|g| g.items())
        .unwrap_or_default()
        .iter()
        .filter_map(|id| match &definition.item(*id).kind {
            ItemKind::Keyword { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

fn group_items(definition: &SyntaxDefinition, group: &str) -> Vec<vimsyn::ItemId> {
    definition.group(group).unwrap().items().to_vec()
}

#[rstest]
#[case::plain("miniStatement", &["return", "break", "continue"])]
#[case::continuation("miniType", &["int", "char", "long", "short"])]
#[case::elseif_branch("miniNew", &["new"])]
#[case::skipped_branches("miniOld", &[])]
#[case::single_line_if("miniDebug", &["debug"])]
#[case::runtime_until_finish("miniLinked", &["linked"])]
fn test_keywords(
    main_definition: &SyntaxDefinition,
    #[case] group: &str,
    #[case] expected: &[&str],
) {
    assert_eq!(expected, keyword_names(main_definition, group));
}

#[rstest]
fn test_contexts(main_definition: &SyntaxDefinition) {
    assert_eq!("main", main_definition.syntax_id());
    assert!(main_definition.is_finished());
    let names: Vec<&str> = main_definition
        .contexts()
        .iter()
        .map(|c| c.name())
        .collect();
    assert_eq!(vec!["main", "embedded"], names);
    let embedded = main_definition.context_id("embedded").unwrap();
    for id in group_items(main_definition, "embKeyword") {
        assert_eq!(embedded, main_definition.item(id).context);
    }
    for id in group_items(main_definition, "miniLinked") {
        assert_eq!(ContextId::MAIN, main_definition.item(id).context);
    }
}

#[rstest]
fn test_case_and_keyword_index(main_definition: &SyntaxDefinition) {
    let main = main_definition.main_context();
    assert_eq!(1, main.keyword_items("true").len());
    assert_eq!(1, main.keyword_items("True").len());
    assert!(main.keyword_items("RETURN").is_empty());
    assert_eq!(1, main.keyword_items("return").len());
    assert!(main_definition.keyword_chars().contains('-'));
}

#[rstest]
fn test_matches_and_regions(main_definition: &SyntaxDefinition) {
    let number = main_definition.item(group_items(main_definition, "miniNumber")[0]);
    assert!(number.flags.display);

    let string = main_definition.item(group_items(main_definition, "miniString")[0]);
    match &string.kind {
        ItemKind::Region {
            start,
            skip,
            end,
            one_line,
            contains,
            ..
        } => {
            assert_eq!(Some("miniQuote"), start[0].match_group.as_deref());
            assert_eq!(1, skip.len());
            assert_eq!(Some("miniQuote"), end[0].match_group.as_deref());
            assert!(*one_line);
            let escapes = main_definition.cluster(contains.unwrap()).items();
            assert_eq!(group_items(main_definition, "miniEscape"), escapes);
        }
        other => panic!("unexpected kind {other:?}"),
    }

    let comment = main_definition.item(group_items(main_definition, "miniComment")[0]);
    let todo = group_items(main_definition, "miniTodo");
    assert_eq!(2, todo.len());
    assert_eq!(
        todo,
        main_definition.cluster(comment.contains().unwrap()).items()
    );
}

#[rstest]
fn test_allbut_cluster(main_definition: &SyntaxDefinition) {
    let block = main_definition.item(group_items(main_definition, "miniBlock")[0]);
    assert!(block.flags.transparent && block.flags.fold);
    let cluster = main_definition.cluster(block.contains().unwrap());
    assert_eq!(ClusterType::AllBut, cluster.cluster_type());
    let todo = group_items(main_definition, "miniTodo");
    assert!(cluster.items().iter().all(|i| !todo.contains(i)));
    assert_eq!(
        main_definition.main_context().items().len() - todo.len(),
        cluster.items().len()
    );
}

#[rstest]
fn test_named_clusters(main_definition: &SyntaxDefinition) {
    let top = main_definition.named_cluster("@miniTop").unwrap();
    assert_eq!(
        &["miniStatement".to_string(), "miniNumber".to_string()],
        top.members()
    );
    assert_eq!(4, top.items().len());

    let embedded = main_definition.named_cluster("@miniEmbedded").unwrap();
    let mut expected = group_items(main_definition, "embKeyword");
    expected.extend(group_items(main_definition, "embParen"));
    let mut items = embedded.items().to_vec();
    items.sort_by_key(|i| i.as_usize());
    assert_eq!(expected, items);
    assert!(main_definition.named_cluster("@Spell").is_some());
}

#[rstest]
#[case::direct("miniStatement", "Statement")]
#[case::chain("miniQuote", "String")]
#[case::embedded("embKeyword", "Keyword")]
#[case::unlinked("miniEscape", "miniEscape")]
fn test_highlight_links(
    main_definition: &SyntaxDefinition,
    #[case] group: &str,
    #[case] expected: &str,
) {
    assert_eq!(expected, main_definition.resolve_highlight(group));
}

#[test]
fn test_loader() {
    init();
    let loader = SyntaxLoader::new(data_dir());
    let definition = loader.build_syntax_definition("embedded").unwrap();
    assert_eq!(1, definition.contexts().len());
    assert_eq!(5, definition.main_context().items().len());
    assert!(loader.build_syntax_definition("nothere").is_err());
}

#[test]
fn test_errors_in_included_files() {
    init();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("outer.vim"),
        "\" outer\nsyn include @Inner <sfile>:p:h/inner.vim\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("inner.vim"),
        "syn keyword X y\nsyn region X start=/a/ contained\n",
    )
    .unwrap();
    let err = ScriptParserBuilder::new()
        .build(dir.path().join("outer.vim"))
        .unwrap()
        .parse()
        .unwrap_err();
    match &*err.source {
        VimsynErrorKind::ParsingFailed { file, line, source } => {
            assert!(file.ends_with("inner.vim"));
            assert_eq!(2, *line);
            assert!(matches!(*source.source, VimsynErrorKind::InvalidRegion(_)));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_missing_included_file() {
    init();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("outer.vim"),
        "syn include @Inner syntax/missing.vim\n",
    )
    .unwrap();
    let err = ScriptParserBuilder::new()
        .build(dir.path().join("outer.vim"))
        .unwrap()
        .parse()
        .unwrap_err();
    match &*err.source {
        VimsynErrorKind::ParsingFailed { file, line, source } => {
            assert!(file.ends_with("outer.vim"));
            assert_eq!(1, *line);
            assert!(matches!(
                *source.source,
                VimsynErrorKind::SyntaxFileNotFound(_)
            ));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[rstest]
#[case::single_line_if_opener(
    "if 0 | let b:x = 1\n  syn keyword X b\n  syn region R start=/a/ end=/b/\nendif\nsyn keyword X c\n",
    &["c"],
    0
)]
#[case::multiple_skip_patterns(
    "syn keyword X c\nsyn region R start=/</ skip=/\\\\>/ skip=/->/ end=/>/\n",
    &["c"],
    2
)]
fn test_scripts(#[case] script: &str, #[case] keywords: &[&str], #[case] skips: usize) {
    init();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("script.vim");
    std::fs::write(&path, script).unwrap();
    let definition = ScriptParserBuilder::new()
        .verify_regexes(true)
        .build(&path)
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(keywords, keyword_names(&definition, "X"));
    let regions: Vec<usize> = definition
        .group("R")
        .map(|g| g.items())
        .unwrap_or_default()
        .iter()
        .filter_map(|id| match &definition.item(*id).kind {
            ItemKind::Region { skip, .. } => Some(skip.len()),
            _ => None,
        })
        .collect();
    if skips == 0 {
        assert!(regions.is_empty());
    } else {
        assert_eq!(vec![skips], regions);
    }
}

#[cfg(feature = "serde")]
#[rstest]
fn test_json_dump(main_definition: &SyntaxDefinition) {
    let json = main_definition.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!("main", value["syntax_id"]);
    assert!(json.contains("miniStatement"));
}
