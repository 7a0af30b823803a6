pub mod formatter;

use crate::error::{GramevoError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Rule separator in BNF sources: `<lhs> ::= alt1 | alt2`
pub const RULE_SEPARATOR: &str = "::=";
/// Separator between alternatives on a rule's right-hand side.
pub const ALTERNATIVE_SEPARATOR: char = '|';
/// Sentinel keyword for an alternative that emits nothing.
pub const EMPTY_TERMINAL: &str = "None";

/// Depth value for alternatives that can never reach a terminal-only derivation.
const UNREACHABLE: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Terminal,
    NonTerminal,
}

/// One symbol in a production body: literal text, tagged terminal or
/// non-terminal. Non-terminals keep their angle-bracket spelling (`<expr>`)
/// so they can be matched against rule left-hand sides verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub text: String,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn terminal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: SymbolKind::Terminal,
        }
    }

    pub fn non_terminal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: SymbolKind::NonTerminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == SymbolKind::Terminal
    }
}

/// An ordered sequence of symbols: one possible expansion of a non-terminal.
pub type Alternative = Vec<Symbol>;

/// Immutable context-free grammar.
///
/// Built once from a BNF description, then shared by reference with the
/// mapper and the genetic operators. The position of a non-terminal in
/// `ordered_non_terminals` (first-appearance order of rule left-hand sides)
/// is its chromosome index and never changes for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct Grammar {
    ordered_non_terminals: Vec<String>,
    index_of: HashMap<String, usize>,
    productions: Vec<Vec<Alternative>>,
    non_recursive: Vec<Vec<usize>>,
    shortest: Vec<Vec<usize>>,
    start: usize,
    indent_aware: bool,
}

impl Grammar {
    /// Parses a line-oriented BNF source. `#`-prefixed lines and blank lines
    /// are skipped. The first rule defines the start symbol. A duplicate rule
    /// for an already-defined non-terminal is ignored with a warning.
    pub fn parse(source: &str, indent_aware: bool) -> Result<Grammar> {
        let mut ordered_non_terminals: Vec<String> = Vec::new();
        let mut index_of: HashMap<String, usize> = HashMap::new();
        let mut productions: Vec<Vec<Alternative>> = Vec::new();

        for line in source.lines() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let (left, right) = line.split_once(RULE_SEPARATOR).ok_or_else(|| {
                GramevoError::GrammarFormat(format!("missing rule separator: {line:?}"))
            })?;
            let left = left.trim();
            if !is_single_non_terminal(left) {
                return Err(GramevoError::GrammarFormat(format!(
                    "left side is not a single non-terminal: {left:?}"
                )));
            }
            if index_of.contains_key(left) {
                log::warn!("duplicate rule for {left} ignored");
                continue;
            }

            let alternatives: Vec<Alternative> = right
                .split(ALTERNATIVE_SEPARATOR)
                .map(|alt| tokenize_alternative(alt.trim()))
                .collect();

            index_of.insert(left.to_string(), ordered_non_terminals.len());
            ordered_non_terminals.push(left.to_string());
            productions.push(alternatives);
        }

        if productions.is_empty() {
            return Err(GramevoError::GrammarFormat(
                "grammar source contains no rules".to_string(),
            ));
        }

        let non_recursive = compute_non_recursive(&ordered_non_terminals, &productions);
        let shortest = compute_shortest(&index_of, &productions);

        Ok(Grammar {
            ordered_non_terminals,
            index_of,
            productions,
            non_recursive,
            shortest,
            start: 0,
            indent_aware,
        })
    }

    /// Reads a grammar file. A `.pybnf` extension flags the grammar as
    /// producing indentation-significant text.
    pub fn load(path: impl AsRef<Path>) -> Result<Grammar> {
        let path = path.as_ref();
        let indent_aware = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pybnf"));
        let source = std::fs::read_to_string(path)?;
        log::debug!("loaded grammar from {} (indent_aware: {indent_aware})", path.display());
        Self::parse(&source, indent_aware)
    }

    /// Chromosome index of the axiom (the first rule in the source).
    pub fn start_index(&self) -> usize {
        self.start
    }

    pub fn non_terminal_count(&self) -> usize {
        self.ordered_non_terminals.len()
    }

    /// Non-terminal names in first-appearance order; position is chromosome index.
    pub fn ordered_non_terminals(&self) -> &[String] {
        &self.ordered_non_terminals
    }

    pub fn index_of(&self, non_terminal: &str) -> Option<usize> {
        self.index_of.get(non_terminal).copied()
    }

    pub fn name(&self, index: usize) -> &str {
        &self.ordered_non_terminals[index]
    }

    pub fn alternatives(&self, index: usize) -> &[Alternative] {
        &self.productions[index]
    }

    pub fn alternative_count(&self, index: usize) -> usize {
        self.productions[index].len()
    }

    /// Alternative indices containing no direct self-reference. A one-level
    /// check only: it does not chase recursion through other non-terminals.
    pub fn non_recursive_alternatives(&self, index: usize) -> &[usize] {
        &self.non_recursive[index]
    }

    /// Alternative indices minimizing the derivation depth needed to reach a
    /// fully terminal expansion. Empty only when no alternative terminates.
    pub fn shortest_alternatives(&self, index: usize) -> &[usize] {
        &self.shortest[index]
    }

    pub fn indent_aware(&self) -> bool {
        self.indent_aware
    }

    /// Applies the indentation formatter when the grammar opts into it,
    /// otherwise returns the raw derivation text unchanged.
    pub fn format_phenotype(&self, raw: String) -> String {
        if self.indent_aware {
            formatter::apply(&raw)
        } else {
            raw
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, nt) in self.ordered_non_terminals.iter().enumerate() {
            write!(f, "{nt} {RULE_SEPARATOR} ")?;
            for (a, alternative) in self.productions[index].iter().enumerate() {
                if a > 0 {
                    write!(f, " {ALTERNATIVE_SEPARATOR} ")?;
                }
                for symbol in alternative {
                    write!(f, "{}", symbol.text)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// True when `text` is exactly one `<...>` reference.
fn is_single_non_terminal(text: &str) -> bool {
    text.len() > 2
        && text.starts_with('<')
        && text.ends_with('>')
        && !text[1..text.len() - 1].contains(['<', '>'])
}

/// Finds the next `<...>` span (non-greedy, at least one character inside).
/// Returns byte offsets `(start, end_exclusive)`.
fn find_reference(text: &str) -> Option<(usize, usize)> {
    let mut search_from = 0;
    while let Some(open) = text[search_from..].find('<') {
        let open = search_from + open;
        match text[open + 1..].find('>') {
            Some(0) => search_from = open + 2, // "<>" is not a reference
            Some(offset) => return Some((open, open + 1 + offset + 1)),
            None => return None,
        }
    }
    None
}

/// Splits one alternative into its symbol sequence. An alternative with no
/// `<...>` reference is a single terminal, with the `None` keyword standing
/// for the empty terminal.
fn tokenize_alternative(alternative: &str) -> Alternative {
    if find_reference(alternative).is_none() {
        let text = if alternative == EMPTY_TERMINAL {
            ""
        } else {
            alternative
        };
        return vec![Symbol::terminal(text)];
    }

    let mut symbols = Vec::new();
    let mut rest = alternative;
    while !rest.is_empty() {
        match find_reference(rest) {
            Some((start, end)) => {
                if start > 0 {
                    symbols.push(Symbol::terminal(&rest[..start]));
                }
                symbols.push(Symbol::non_terminal(&rest[start..end]));
                rest = &rest[end..];
            }
            None => {
                symbols.push(Symbol::terminal(rest));
                rest = "";
            }
        }
    }
    symbols
}

fn compute_non_recursive(
    non_terminals: &[String],
    productions: &[Vec<Alternative>],
) -> Vec<Vec<usize>> {
    non_terminals
        .iter()
        .zip(productions)
        .map(|(nt, alternatives)| {
            alternatives
                .iter()
                .enumerate()
                .filter(|(_, alternative)| {
                    !alternative
                        .iter()
                        .any(|s| s.kind == SymbolKind::NonTerminal && s.text == *nt)
                })
                .map(|(index, _)| index)
                .collect()
        })
        .collect()
}

/// Fixpoint over minimal termination depths. A terminal-only alternative has
/// depth 1; otherwise 1 plus the deepest referenced non-terminal. Undefined
/// references and alternatives trapped in recursion stay at `UNREACHABLE`.
fn compute_shortest(
    index_of: &HashMap<String, usize>,
    productions: &[Vec<Alternative>],
) -> Vec<Vec<usize>> {
    let n = productions.len();
    let mut nt_depth = vec![UNREACHABLE; n];

    loop {
        let mut changed = false;
        for index in 0..n {
            let best = productions[index]
                .iter()
                .map(|alternative| alternative_depth(alternative, index_of, &nt_depth))
                .min()
                .unwrap_or(UNREACHABLE);
            if best < nt_depth[index] {
                nt_depth[index] = best;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    productions
        .iter()
        .map(|alternatives| {
            let depths: Vec<usize> = alternatives
                .iter()
                .map(|alternative| alternative_depth(alternative, index_of, &nt_depth))
                .collect();
            let best = depths.iter().copied().min().unwrap_or(UNREACHABLE);
            if best == UNREACHABLE {
                return Vec::new();
            }
            depths
                .iter()
                .enumerate()
                .filter(|(_, d)| **d == best)
                .map(|(index, _)| index)
                .collect()
        })
        .collect()
}

fn alternative_depth(
    alternative: &Alternative,
    index_of: &HashMap<String, usize>,
    nt_depth: &[usize],
) -> usize {
    let mut deepest = 0usize;
    for symbol in alternative {
        if symbol.kind != SymbolKind::NonTerminal {
            continue;
        }
        match index_of.get(&symbol.text) {
            Some(&index) if nt_depth[index] != UNREACHABLE => {
                deepest = deepest.max(nt_depth[index]);
            }
            _ => return UNREACHABLE,
        }
    }
    deepest.saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGRESSION: &str = "\
# toy regression grammar
<start> ::= <expr>
<expr> ::= <expr><op><expr> | <var>
<op> ::= + | - | *
<var> ::= x | 1.0
";

    #[test]
    fn parses_rules_in_first_appearance_order() {
        let grammar = Grammar::parse(REGRESSION, false).unwrap();
        assert_eq!(
            grammar.ordered_non_terminals(),
            &["<start>", "<expr>", "<op>", "<var>"]
        );
        assert_eq!(grammar.start_index(), 0);
        assert_eq!(grammar.alternative_count(1), 2);
        assert_eq!(grammar.alternative_count(2), 3);
    }

    #[test]
    fn tokenizes_mixed_alternatives() {
        let grammar = Grammar::parse(REGRESSION, false).unwrap();
        let recursive = &grammar.alternatives(1)[0];
        assert_eq!(
            recursive,
            &vec![
                Symbol::non_terminal("<expr>"),
                Symbol::non_terminal("<op>"),
                Symbol::non_terminal("<expr>"),
            ]
        );
        let terminal = &grammar.alternatives(3)[0];
        assert_eq!(terminal, &vec![Symbol::terminal("x")]);
    }

    #[test]
    fn terminal_and_non_terminal_runs_interleave() {
        let grammar = Grammar::parse("<s> ::= f(<s>) | x", false).unwrap();
        assert_eq!(
            grammar.alternatives(0)[0],
            vec![
                Symbol::terminal("f("),
                Symbol::non_terminal("<s>"),
                Symbol::terminal(")"),
            ]
        );
    }

    #[test]
    fn none_keyword_is_empty_terminal() {
        let grammar = Grammar::parse("<s> ::= a<t> | None\n<t> ::= b", false).unwrap();
        assert_eq!(grammar.alternatives(0)[1], vec![Symbol::terminal("")]);
    }

    #[test]
    fn non_recursive_alternatives_are_shallow() {
        let grammar = Grammar::parse(REGRESSION, false).unwrap();
        // <expr> alt 0 references itself, alt 1 does not.
        assert_eq!(grammar.non_recursive_alternatives(1), &[1]);
        // <start> references <expr> but never itself.
        assert_eq!(grammar.non_recursive_alternatives(0), &[0]);
    }

    #[test]
    fn shortest_alternatives_follow_min_termination_depth() {
        let grammar = Grammar::parse(REGRESSION, false).unwrap();
        // <expr>: the <var> branch terminates in 2 levels, the recursive one in 3.
        assert_eq!(grammar.shortest_alternatives(1), &[1]);
        // All <op> alternatives are terminal-only, so all are shortest.
        assert_eq!(grammar.shortest_alternatives(2), &[0, 1, 2]);
    }

    #[test]
    fn purely_recursive_non_terminal_has_no_shortest_path() {
        let grammar = Grammar::parse("<s> ::= a<loop>\n<loop> ::= x<loop>", false).unwrap();
        let index = grammar.index_of("<loop>").unwrap();
        assert!(grammar.non_recursive_alternatives(index).is_empty());
        assert!(grammar.shortest_alternatives(index).is_empty());
        assert!(grammar.shortest_alternatives(0).is_empty());
    }

    #[test]
    fn missing_separator_is_a_format_error() {
        let err = Grammar::parse("<s> = a", false).unwrap_err();
        assert!(matches!(err, GramevoError::GrammarFormat(_)));
    }

    #[test]
    fn compound_left_side_is_a_format_error() {
        for bad in ["<a><b> ::= x", "a ::= x", "<> ::= x"] {
            let err = Grammar::parse(bad, false).unwrap_err();
            assert!(matches!(err, GramevoError::GrammarFormat(_)), "{bad}");
        }
    }

    #[test]
    fn comments_blank_lines_and_duplicates_are_skipped() {
        let source = "# header\n\n<s> ::= a\n<s> ::= b\n";
        let grammar = Grammar::parse(source, false).unwrap();
        assert_eq!(grammar.non_terminal_count(), 1);
        assert_eq!(grammar.alternatives(0)[0], vec![Symbol::terminal("a")]);
    }

    #[test]
    fn empty_source_is_rejected() {
        assert!(Grammar::parse("# only comments\n", false).is_err());
    }

    #[test]
    fn display_round_trips_rule_text() {
        let grammar = Grammar::parse("<s> ::= a<t> | b\n<t> ::= c", false).unwrap();
        let text = grammar.to_string();
        assert_eq!(text, "<s> ::= a<t> | b\n<t> ::= c\n");
        let reparsed = Grammar::parse(&text, false).unwrap();
        assert_eq!(reparsed.ordered_non_terminals(), grammar.ordered_non_terminals());
    }
}
