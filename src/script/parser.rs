use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    rc::Rc,
};

use log::{debug, info, trace, warn};
use regex::Captures;

use super::{
    conditional::split_commands, strip_comment, DelimitedPatterns, IfStatement, ScriptRules,
};
use crate::{
    ContextId, Evaluator, EvaluatorDefaults, Result, SyntaxDefinition, VimsynError,
    VimsynErrorKind,
};

/// Nesting limit of `syn include` and `runtime`, it stops cyclic imports.
pub(crate) const MAX_INCLUDE_DEPTH: usize = 32;

/// A script on the open-file stack.
#[derive(Debug)]
struct SourceFile {
    path: PathBuf,
    context: ContextId,
    line: usize,
    if_depth: usize,
    finished: bool,
}

/// Reads a Vim syntax script and the scripts it imports into a [SyntaxDefinition].
///
/// Lines are joined with their continuation lines and dispatched to line rules. `if` chains
/// are evaluated with an [Evaluator], commands in branches that are not taken are skipped.
/// Errors of a line are reported with file and line number, see
/// [VimsynErrorKind::ParsingFailed].
///
/// Use [crate::ScriptParserBuilder] to create a parser.
#[derive(Debug)]
pub struct ScriptParser {
    root: PathBuf,
    pub(super) definition: SyntaxDefinition,
    pub(super) evaluator: Evaluator,
    pub(super) verify_regexes: bool,
    pub(super) ignore_case: bool,
    if_stack: Vec<IfStatement>,
    files: Vec<SourceFile>,
    pub(super) rules: Rc<ScriptRules>,
    pub(super) patterns: DelimitedPatterns,
}

impl ScriptParser {
    pub(crate) fn new(
        root: PathBuf,
        evaluator_defaults: &EvaluatorDefaults,
        verify_regexes: bool,
    ) -> Result<Self> {
        let syntax_id = root
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            root,
            definition: SyntaxDefinition::new(&syntax_id),
            evaluator: Evaluator::with_defaults(evaluator_defaults),
            verify_regexes,
            ignore_case: false,
            if_stack: Vec::new(),
            files: Vec::new(),
            rules: Rc::new(ScriptRules::new()?),
            patterns: DelimitedPatterns::default(),
        })
    }

    /// Parses the root script and returns the finished definition.
    pub fn parse(mut self) -> Result<SyntaxDefinition> {
        let root = self.root.clone();
        self.process_file(&root, ContextId::MAIN)?;
        self.definition.finish()?;
        Ok(self.definition)
    }

    /// The root script.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The definition built so far.
    pub fn definition(&self) -> &SyntaxDefinition {
        &self.definition
    }

    /// The evaluator with the variables the scripts defined so far.
    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Returns true if commands are executed, i.e. every open `if` is in a taken branch.
    pub fn is_processing_tokens(&self) -> bool {
        self.if_stack.iter().all(|statement| statement.taking_branch)
    }

    /// Parses a script into a context. The script is closed before this returns.
    pub(super) fn process_file(&mut self, path: &Path, context: ContextId) -> Result<()> {
        if self.files.len() >= MAX_INCLUDE_DEPTH {
            return Err(VimsynError::new(VimsynErrorKind::MaxIncludeDepth(
                MAX_INCLUDE_DEPTH,
            )));
        }
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                VimsynError::new(VimsynErrorKind::SyntaxFileNotFound(path.to_path_buf()))
            }
            _ => e.into(),
        })?;
        info!(
            "Parsing {} into context '{}'",
            path.display(),
            self.definition.context(context).name()
        );
        self.files.push(SourceFile {
            path: path.to_path_buf(),
            context,
            line: 0,
            if_depth: self.if_stack.len(),
            finished: false,
        });
        let result = self.process_lines(BufReader::new(file));
        if let Some(source) = self.files.pop() {
            self.if_stack.truncate(source.if_depth);
        }
        result
    }

    fn process_lines<R: BufRead>(&mut self, mut reader: R) -> Result<()> {
        let mut buffer = Vec::new();
        let mut number = 0;
        let mut pending: Option<(usize, String)> = None;
        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            number += 1;
            let text = String::from_utf8_lossy(&buffer);
            let text = text.trim_end_matches(['\n', '\r']);
            if let (Some(tail), Some((_, line))) =
                (text.trim_start().strip_prefix('\\'), pending.as_mut())
            {
                join_continuation(line, tail);
                continue;
            }
            if let Some((first, line)) = pending.replace((number, text.to_string())) {
                self.process_logical_line(first, &line)?;
                if self.is_file_finished() {
                    return Ok(());
                }
            }
        }
        if let Some((first, line)) = pending {
            self.process_logical_line(first, &line)?;
        }
        Ok(())
    }

    fn process_logical_line(&mut self, number: usize, line: &str) -> Result<()> {
        if let Some(file) = self.files.last_mut() {
            file.line = number;
        }
        self.dispatch_line(line).map_err(|e| self.line_error(e))
    }

    /// Runs the first matching rule for a logical line or a `|` separated part of it.
    pub(super) fn dispatch_line(&mut self, line: &str) -> Result<()> {
        let rules = Rc::clone(&self.rules);
        if rules.conditionals.dispatch(self, line)? {
            return Ok(());
        }
        if !self.is_processing_tokens() {
            trace!("Skipping '{line}'");
            return Ok(());
        }
        if !rules.commands.dispatch(self, line)? {
            debug!(
                "{}:{}: Ignoring '{line}'",
                self.current_path().display(),
                self.current_line()
            );
        }
        Ok(())
    }

    fn line_error(&self, error: VimsynError) -> VimsynError {
        if error.is_engine_fault() {
            warn!(
                "{}:{}: {error}",
                self.current_path().display(),
                self.current_line()
            );
            return error;
        }
        if matches!(*error.source, VimsynErrorKind::ParsingFailed { .. }) {
            return error;
        }
        VimsynError::new(VimsynErrorKind::ParsingFailed {
            file: self.current_path().to_path_buf(),
            line: self.current_line(),
            source: error,
        })
    }

    fn is_file_finished(&self) -> bool {
        self.files.last().is_some_and(|file| file.finished)
    }

    /// The context the current script fills.
    pub(super) fn current_context(&self) -> ContextId {
        self.files.last().map_or(ContextId::MAIN, |file| file.context)
    }

    /// The line number of the current logical line.
    pub(super) fn current_line(&self) -> usize {
        self.files.last().map_or(0, |file| file.line)
    }

    pub(super) fn current_path(&self) -> &Path {
        self.files
            .last()
            .map_or(self.root.as_path(), |file| file.path.as_path())
    }

    /// The script of a syntax id next to the current script.
    pub(super) fn sibling_script(&self, syntax_id: &str) -> PathBuf {
        self.current_path()
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(format!("{syntax_id}.vim"))
    }

    pub(super) fn finish_current_file(&mut self) {
        if let Some(file) = self.files.last_mut() {
            debug!("{}:{}: finish", file.path.display(), file.line);
            file.finished = true;
        }
    }

    pub(super) fn on_if(&mut self, captures: &Captures<'_>) -> Result<()> {
        let text = strip_comment(&captures["condition"]);
        let mut segments = split_commands(text).into_iter();
        let condition = segments.next().unwrap_or_default().trim();
        if condition.is_empty() {
            return Err(VimsynError::new(VimsynErrorKind::MalformedCommand(
                "':if' without condition".to_string(),
            )));
        }
        let depth = self.if_stack.len();
        let active = self.is_processing_tokens();
        let statement = IfStatement::new(condition, active, &mut self.evaluator)?;
        trace!("if {} -> {}", statement.condition, statement.taking_branch);
        self.if_stack.push(statement);
        let mut commands: Vec<&str> = segments.map(str::trim).collect();
        let closed = commands.last().is_some_and(|last| is_end_if(last));
        if closed {
            commands.pop();
        }
        for command in commands {
            self.dispatch_line(command)?;
        }
        // Without a trailing `endif` the frame stays open for a later `endif` line.
        if closed {
            self.if_stack.truncate(depth);
        }
        Ok(())
    }

    pub(super) fn on_else_if(&mut self, captures: &Captures<'_>) -> Result<()> {
        let condition = strip_comment(&captures["condition"]).trim();
        let statement = self.if_stack.last_mut().ok_or_else(|| {
            VimsynError::new(VimsynErrorKind::MalformedCommand(
                "':elseif' without ':if'".to_string(),
            ))
        })?;
        statement.else_if(condition, &mut self.evaluator)
    }

    pub(super) fn on_else(&mut self, _: &Captures<'_>) -> Result<()> {
        self.if_stack
            .last_mut()
            .ok_or_else(|| {
                VimsynError::new(VimsynErrorKind::MalformedCommand(
                    "':else' without ':if'".to_string(),
                ))
            })?
            .otherwise();
        Ok(())
    }

    pub(super) fn on_end_if(&mut self, _: &Captures<'_>) -> Result<()> {
        self.if_stack
            .pop()
            .map(|_| ())
            .ok_or_else(|| VimsynError::new(VimsynErrorKind::EmptyIfStack))
    }
}

/// Returns true for `en`, `end`, `endi` and `endif`.
fn is_end_if(command: &str) -> bool {
    matches!(command, "en" | "end" | "endi" | "endif")
}

/// Appends the text after the backslash of a continuation line. Blanks are dropped after a
/// comma or an equals sign.
pub(crate) fn join_continuation(line: &mut String, tail: &str) {
    if line.ends_with([',', '=']) {
        line.push_str(tail.trim_start_matches([' ', '\t']));
    } else {
        line.push_str(tail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ItemKind, ScriptParserBuilder};
    use rstest::rstest;
    use std::io::Write;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn parse(script: &str) -> Result<SyntaxDefinition> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.vim");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(script.as_bytes())
            .unwrap();
        ScriptParserBuilder::new().build(&path)?.parse()
    }

    fn keywords(definition: &SyntaxDefinition, group: &str) -> Vec<String> {
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

    #[test]
    fn test_join_continuation() {
        let mut line = "foo,".to_string();
        join_continuation(&mut line, " bar");
        assert_eq!("foo,bar", line);
        let mut line = "foo".to_string();
        join_continuation(&mut line, " bar");
        assert_eq!("foo bar", line);
    }

    #[test]
    fn test_continuation_lines_keep_first_line_number() {
        init();
        let definition = parse(
            "\" comment\nsyn keyword Foo\n      \\ one\n      \\ two\nsyn keyword Bar three\n",
        )
        .unwrap();
        assert_eq!(vec!["one", "two"], keywords(&definition, "Foo"));
        let first = definition.group("Foo").unwrap().items()[0];
        assert_eq!(2, definition.item(first).line);
        let bar = definition.group("Bar").unwrap().items()[0];
        assert_eq!(5, definition.item(bar).line);
    }

    #[test]
    fn test_if_else() {
        init();
        let script = "if {}\n  syntax keyword X y\nelse\n  syntax keyword X z\nendif\n";
        let definition = parse(&script.replace("{}", "0")).unwrap();
        assert_eq!(vec!["z"], keywords(&definition, "X"));
        let definition = parse(&script.replace("{}", "1")).unwrap();
        assert_eq!(vec!["y"], keywords(&definition, "X"));
    }

    #[test]
    fn test_elseif_takes_first_true_branch() {
        init();
        let definition = parse(
            "if version < 600\n syn keyword X a\nelseif version < 800\n syn keyword X b\n\
             elseif version < 900\n syn keyword X c\nelse\n syn keyword X d\nendif\n",
        )
        .unwrap();
        assert_eq!(vec!["b"], keywords(&definition, "X"));
    }

    #[test]
    fn test_nested_if_in_skipped_branch() {
        init();
        let definition = parse(
            "if 0\n if 1\n  syn keyword X a\n else\n  syn keyword X b\n endif\nelse\n syn keyword X c\nendif\n",
        )
        .unwrap();
        assert_eq!(vec!["c"], keywords(&definition, "X"));
    }

    #[rstest]
    #[case::closed_on_same_line(
        "if 1 | syn keyword X a | endif\nif 0 | syn keyword X b | en\nsyn keyword X c\n",
        &["a", "c"]
    )]
    #[case::taken_opener_with_body(
        "if 1 | syn keyword X a\n  syn keyword X b\nendif\nsyn keyword X c\n",
        &["a", "b", "c"]
    )]
    #[case::skipped_opener_with_body(
        "if 0 | let a = 1\n  syn keyword X b\nendif\nsyn keyword X c\n",
        &["c"]
    )]
    #[case::opener_with_else(
        "if 0 | syn keyword X a\nelse\n  syn keyword X b\nendif\n",
        &["b"]
    )]
    fn test_single_line_if(#[case] script: &str, #[case] expected: &[&str]) {
        init();
        let definition = parse(script).unwrap();
        assert_eq!(expected, keywords(&definition, "X"));
    }

    #[test]
    fn test_single_line_if_without_endif_keeps_frame_open() {
        init();
        let err = parse("if 1 | syn keyword X a\nsyn keyword X b\nendif\nendif\n").unwrap_err();
        assert!(matches!(*err.source, VimsynErrorKind::EmptyIfStack));
    }

    #[test]
    fn test_finish_stops_the_file() {
        init();
        let definition = parse(
            "syn keyword X a\nif exists(\"b:done\")\n  finish\nendif\nlet b:done = 1\nsyn keyword X b\nif exists(\"b:done\")\n  finish\nendif\nsyn keyword X c\n",
        )
        .unwrap();
        assert_eq!(vec!["a", "b"], keywords(&definition, "X"));
    }

    #[test]
    fn test_errors_carry_file_and_line() {
        init();
        let err = parse("syn keyword X a\nsyn region X start=/a/\n").unwrap_err();
        match &*err.source {
            VimsynErrorKind::ParsingFailed { line, source, .. } => {
                assert_eq!(2, *line);
                assert!(matches!(*source.source, VimsynErrorKind::InvalidRegion(_)));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_endif_without_if_is_a_fault() {
        init();
        let err = parse("syn keyword X a\nendif\n").unwrap_err();
        assert!(matches!(*err.source, VimsynErrorKind::EmptyIfStack));
        let err = parse("else\n").unwrap_err();
        assert!(matches!(
            &*err.source,
            VimsynErrorKind::ParsingFailed { .. }
        ));
    }

    #[test]
    fn test_unlexable_condition_is_a_fault() {
        init();
        let err = parse("syn keyword X a\nif x =~ 'a'\nendif\n").unwrap_err();
        assert!(err.is_engine_fault());
        assert!(matches!(
            *err.source,
            VimsynErrorKind::NoMatchingRule { .. }
        ));
    }

    #[test]
    fn test_cyclic_runtime_hits_include_limit() {
        init();
        let err = parse("runtime! syntax/test.vim\n").unwrap_err();
        let mut source = &err;
        while let VimsynErrorKind::ParsingFailed { source: inner, .. } = &*source.source {
            source = inner;
        }
        assert!(matches!(*source.source, VimsynErrorKind::MaxIncludeDepth(MAX_INCLUDE_DEPTH)));
    }
}
