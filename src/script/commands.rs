use std::rc::Rc;

use log::{debug, trace};
use regex::Captures;

use super::{
    options::split_list, strip_comment, DelimitedPattern, LineKind, ScriptParser, SyntaxOption,
};
use crate::{
    ClusterId, ContextId, ConversionOptions, ItemKind, Pattern, Result, SyntaxItem,
    VimRegexConverter, VimsynError, VimsynErrorKind,
};

impl ScriptParser {
    pub(super) fn on_case(&mut self, captures: &Captures<'_>) -> Result<()> {
        self.ignore_case = &captures["case"] == "ignore";
        debug!("syn case ignore: {}", self.ignore_case);
        Ok(())
    }

    pub(super) fn on_keyword(&mut self, captures: &Captures<'_>) -> Result<()> {
        let group = &captures["group"];
        let line = self
            .rules
            .options
            .scan(&captures["rest"], LineKind::Keyword, &mut self.patterns)?;
        let (context, number) = (self.current_context(), self.current_line());
        for word in &line.keywords {
            let mut item = SyntaxItem::keyword(group, context, number, word, self.ignore_case);
            self.apply_options(&mut item, &line.options)?;
            self.definition.add_item(item);
        }
        Ok(())
    }

    pub(super) fn on_match(&mut self, captures: &Captures<'_>) -> Result<()> {
        let group = &captures["group"];
        let line = self
            .rules
            .options
            .scan(&captures["rest"], LineKind::Match, &mut self.patterns)?;
        let pattern = line.pattern.as_ref().ok_or_else(|| {
            VimsynError::new(VimsynErrorKind::MalformedCommand(format!(
                "'syn match {group}' without pattern"
            )))
        })?;
        let exclude_nl = line.options.contains(&SyntaxOption::ExcludeNl);
        let pattern = self.make_pattern(pattern, exclude_nl, None)?;
        let mut item = SyntaxItem::new(
            group,
            self.current_context(),
            self.current_line(),
            ItemKind::Match {
                pattern,
                contains: None,
                extend: false,
            },
        );
        self.apply_options(&mut item, &line.options)?;
        self.definition.add_item(item);
        Ok(())
    }

    pub(super) fn on_region(&mut self, captures: &Captures<'_>) -> Result<()> {
        let group = &captures["group"];
        let line = self
            .rules
            .options
            .scan(&captures["rest"], LineKind::Region, &mut self.patterns)?;
        let mut match_group = None;
        let mut exclude_nl = false;
        let (mut start, mut skip, mut end) = (Vec::new(), Vec::new(), Vec::new());
        for option in &line.options {
            match option {
                SyntaxOption::MatchGroup(name) => match_group = name.clone(),
                SyntaxOption::ExcludeNl => exclude_nl = true,
                SyntaxOption::Start(p) => {
                    start.push(self.make_pattern(p, exclude_nl, match_group.clone())?)
                }
                SyntaxOption::Skip(p) => {
                    skip.push(self.make_pattern(p, exclude_nl, match_group.clone())?)
                }
                SyntaxOption::End(p) => {
                    end.push(self.make_pattern(p, exclude_nl, match_group.clone())?)
                }
                _ => {}
            }
        }
        if start.is_empty() || end.is_empty() {
            return Err(VimsynError::new(VimsynErrorKind::InvalidRegion(
                group.to_string(),
            )));
        }
        let mut item = SyntaxItem::new(
            group,
            self.current_context(),
            self.current_line(),
            ItemKind::Region {
                start,
                skip,
                end,
                contains: None,
                extend: false,
                one_line: false,
                keep_end: false,
            },
        );
        self.apply_options(&mut item, &line.options)?;
        self.definition.add_item(item);
        Ok(())
    }

    pub(super) fn on_cluster(&mut self, captures: &Captures<'_>) -> Result<()> {
        let name = &captures["name"];
        let name = if name.starts_with('@') {
            name.to_string()
        } else {
            format!("@{name}")
        };
        let context = self.current_context();
        let id = self.definition.get_or_add_named_cluster(&name, context)?;
        let rules = Rc::clone(&self.rules);
        for argument in rules.cluster_arguments.captures_iter(&captures["rest"]) {
            let list = split_list(&argument["list"]);
            match &argument["command"] {
                "contains" => self.definition.set_cluster_contents(id, &list)?,
                "add" => self.definition.add_to_cluster(id, &list)?,
                _ => self.definition.remove_from_cluster(id, &list)?,
            }
        }
        Ok(())
    }

    pub(super) fn on_include(&mut self, captures: &Captures<'_>) -> Result<()> {
        let syntax_id = &captures["id"];
        let current = self.current_context();
        let context = match self.definition.context_id(syntax_id) {
            Some(context) => {
                debug!("Syntax '{syntax_id}' is included already");
                context
            }
            None => {
                let context = self.definition.get_or_add_context(syntax_id);
                let path = self.sibling_script(syntax_id);
                self.process_file(&path, context)?;
                context
            }
        };
        if let Some(cluster) = captures.name("cluster") {
            let cluster = self
                .definition
                .get_or_add_named_cluster(cluster.as_str(), current)?;
            self.definition.add_top_cluster(context, cluster);
        }
        Ok(())
    }

    pub(super) fn on_runtime(&mut self, captures: &Captures<'_>) -> Result<()> {
        let path = self.sibling_script(&captures["id"]);
        self.process_file(&path, self.current_context())
    }

    pub(super) fn on_finish(&mut self, _: &Captures<'_>) -> Result<()> {
        self.finish_current_file();
        Ok(())
    }

    pub(super) fn on_let(&mut self, captures: &Captures<'_>) -> Result<()> {
        self.evaluator
            .evaluate(strip_comment(&captures["statement"]))?;
        Ok(())
    }

    pub(super) fn on_highlight_link(&mut self, captures: &Captures<'_>) -> Result<()> {
        self.definition
            .add_highlight_link(&captures["from"], &captures["to"]);
        Ok(())
    }

    pub(super) fn on_iskeyword(&mut self, captures: &Captures<'_>) -> Result<()> {
        let list = &captures["list"];
        let keyword_chars = self.definition.keyword_chars_mut();
        if captures.name("plus").is_some() {
            keyword_chars.add(list)
        } else {
            keyword_chars.set(list)
        }
    }

    /// Applies the options that are not about patterns. Options that do not fit the kind of
    /// the item are ignored.
    fn apply_options(&mut self, item: &mut SyntaxItem, options: &[SyntaxOption]) -> Result<()> {
        let context = item.context;
        for option in options {
            match option {
                SyntaxOption::Contained => item.flags.contained = true,
                SyntaxOption::Transparent => item.flags.transparent = true,
                SyntaxOption::SkipWhite => item.flags.skip_white = true,
                SyntaxOption::SkipNl => item.flags.skip_nl = true,
                SyntaxOption::SkipEmpty => item.flags.skip_empty = true,
                SyntaxOption::Fold => item.flags.fold = true,
                SyntaxOption::Display => item.flags.display = true,
                SyntaxOption::ContainedIn(list) => {
                    item.contained_in = Some(self.anonymous_cluster(context, list)?)
                }
                SyntaxOption::NextGroup(list) => {
                    item.next_group = Some(self.anonymous_cluster(context, list)?)
                }
                SyntaxOption::Contains(list) => match &mut item.kind {
                    ItemKind::Match { contains, .. } | ItemKind::Region { contains, .. } => {
                        *contains = Some(self.anonymous_cluster(context, list)?)
                    }
                    ItemKind::Keyword { .. } => {}
                },
                SyntaxOption::Extend => match &mut item.kind {
                    ItemKind::Match { extend, .. } | ItemKind::Region { extend, .. } => {
                        *extend = true
                    }
                    ItemKind::Keyword { .. } => {}
                },
                SyntaxOption::OneLine => {
                    if let ItemKind::Region { one_line, .. } = &mut item.kind {
                        *one_line = true;
                    }
                }
                SyntaxOption::KeepEnd => {
                    if let ItemKind::Region { keep_end, .. } = &mut item.kind {
                        *keep_end = true;
                    }
                }
                SyntaxOption::ExcludeNl
                | SyntaxOption::MatchGroup(_)
                | SyntaxOption::Start(_)
                | SyntaxOption::Skip(_)
                | SyntaxOption::End(_) => {}
            }
        }
        Ok(())
    }

    fn anonymous_cluster(&mut self, context: ContextId, list: &[String]) -> Result<ClusterId> {
        let id = self.definition.add_anonymous_cluster(context);
        self.definition.set_cluster_contents(id, list)?;
        Ok(id)
    }

    /// Converts the body of a delimited pattern and applies its offsets.
    fn make_pattern(
        &self,
        pattern: &DelimitedPattern,
        exclude_nl: bool,
        match_group: Option<String>,
    ) -> Result<Pattern> {
        let options = ConversionOptions::default_multiline()
            .with_ignore_case(self.ignore_case)
            .with_keyword_chars(self.definition.keyword_chars().class_contents());
        let converted = VimRegexConverter::new(options).convert(&pattern.body)?;
        trace!("{} -> {}", pattern.body, converted.regex);
        if self.verify_regexes {
            verify(&pattern.body, &converted.regex)?;
        }
        let mut result = Pattern::from_converted(&converted, exclude_nl);
        result.match_group = match_group;
        if let Some(offsets) = &pattern.offsets {
            result.add_offsets(offsets)?;
        }
        Ok(result)
    }
}

/// Compiles a converted regex. References to external groups of a region start (`\z1`) have no
/// meaning outside of a highlighting engine and are left out.
fn verify(vim_regex: &str, converted: &str) -> Result<()> {
    fancy_regex::Regex::new(&without_external_references(converted))
        .map(|_| ())
        .map_err(|e| {
            VimsynError::new(VimsynErrorKind::RegexVerification {
                vim_regex: vim_regex.to_string(),
                converted: converted.to_string(),
                source: Box::new(e),
            })
        })
}

fn without_external_references(regex: &str) -> String {
    let mut result = String::with_capacity(regex.len());
    let mut chars = regex.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('z') if chars.peek().is_some_and(|d| ('1'..='9').contains(d)) => {
                chars.next();
            }
            Some(escaped) => {
                result.push(c);
                result.push(escaped);
            }
            None => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClusterType, OffsetType, ScriptParserBuilder, SyntaxDefinition};
    use std::io::Write;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn parse_with(script: &str, verify: bool) -> Result<SyntaxDefinition> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.vim");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(script.as_bytes())
            .unwrap();
        ScriptParserBuilder::new()
            .verify_regexes(verify)
            .build(&path)?
            .parse()
    }

    fn parse(script: &str) -> SyntaxDefinition {
        parse_with(script, true).unwrap()
    }

    fn single_item<'a>(definition: &'a SyntaxDefinition, group: &str) -> &'a SyntaxItem {
        let items = definition.group(group).unwrap().items();
        assert_eq!(1, items.len());
        definition.item(items[0])
    }

    #[test]
    fn test_without_external_references() {
        assert_eq!(r"(a)\\z1b", without_external_references(r"(a)\\z1\z1b"));
        assert_eq!(r"\zs", without_external_references(r"\zs"));
    }

    #[test]
    fn test_match_with_escaped_delimiter() {
        init();
        let definition = parse("syn match Foo \"ab\\\"cd\" contained\n");
        let item = single_item(&definition, "Foo");
        assert!(item.flags.contained);
        match &item.kind {
            ItemKind::Match { pattern, .. } => assert_eq!("ab\"cd", pattern.regex),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_match_offsets_and_excludenl() {
        init();
        let definition = parse("syn match Foo /x$/ms=s+1,lc=2 excludenl\nsyn match Bar /y$/\n");
        match &single_item(&definition, "Foo").kind {
            ItemKind::Match { pattern, .. } => {
                assert_eq!(OffsetType::MatchStart, pattern.offsets[0].offset_type);
                assert_eq!(Some(2), pattern.leading_context);
                assert!(!pattern.eat_new_line);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        match &single_item(&definition, "Bar").kind {
            ItemKind::Match { pattern, .. } => assert!(pattern.eat_new_line),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_region_options_apply_in_order() {
        init();
        let definition = parse(
            "syn region cString matchgroup=cQuote start=+L\\=\"+ skip=+\\\\\\\\\\|\\\\\"+ matchgroup=NONE end=+\"+ contains=cSpecial keepend extend\n",
        );
        let item = single_item(&definition, "cString");
        match &item.kind {
            ItemKind::Region {
                start,
                skip,
                end,
                contains,
                keep_end,
                extend,
                one_line,
            } => {
                assert_eq!(Some("cQuote"), start[0].match_group.as_deref());
                assert_eq!(1, skip.len());
                assert_eq!(Some("cQuote"), skip[0].match_group.as_deref());
                assert_eq!(None, end[0].match_group);
                assert!(contains.is_some());
                assert!(*keep_end && *extend && !*one_line);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_region_keeps_every_skip_pattern() {
        init();
        let definition = parse(
            "syn region R start=/a/ skip=/b$/ excludenl skip=/c$/ matchgroup=Q end=/d/\n",
        );
        match &single_item(&definition, "R").kind {
            ItemKind::Region { skip, end, .. } => {
                assert_eq!(2, skip.len());
                assert!(skip[0].regex.starts_with('b') && skip[1].regex.starts_with('c'));
                assert!(skip[0].eat_new_line && !skip[1].eat_new_line);
                assert_eq!(Some("Q"), end[0].match_group.as_deref());
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_keyword_options() {
        init();
        let definition = parse(
            "syn case ignore\nsyn keyword vimCommand contained fu[nction] nextgroup=vimFuncName skipwhite\n",
        );
        let items = definition.group("vimCommand").unwrap().items();
        let item = definition.item(items[0]);
        assert!(item.flags.contained && item.flags.skip_white);
        let next = definition.cluster(item.next_group.unwrap());
        assert_eq!(&["vimFuncName".to_string()], next.members());
        assert_eq!(
            vec![items[0]],
            definition.main_context().keyword_items("FUNC")
        );
    }

    #[test]
    fn test_cluster_commands() {
        init();
        let definition = parse(
            "syn cluster cTop contains=a,b\nsyn cluster cTop add=c\nsyn cluster cTop remove=a\n",
        );
        let cluster = definition.named_cluster("@cTop").unwrap();
        assert_eq!(&["b".to_string(), "c".to_string()], cluster.members());
        assert_eq!(ClusterType::NonMagic, cluster.cluster_type());
    }

    #[test]
    fn test_iskeyword_and_links() {
        init();
        let definition = parse(
            "setlocal iskeyword+=-\nhi def link cType Type\nHiLink cTypedef cType\n",
        );
        assert!(definition.keyword_chars().contains('-'));
        assert!(definition.keyword_chars().contains('a'));
        assert_eq!("Type", definition.resolve_highlight("cTypedef"));
        let definition = parse("set isk=a-z\n");
        assert!(!definition.keyword_chars().contains('A'));
    }

    #[test]
    fn test_verification_failure_is_reported() {
        init();
        let script = "syn match Foo /\\(a\\)\\2/\n";
        assert!(parse_with(script, false).is_ok());
        let err = parse_with(script, true).err();
        let err = err.unwrap();
        match &*err.source {
            VimsynErrorKind::ParsingFailed { source, .. } => assert!(matches!(
                *source.source,
                VimsynErrorKind::RegexVerification { .. }
            )),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
