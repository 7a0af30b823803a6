use crate::engine::mapper::synthesize_codon;
use crate::error::{GramevoError, Result};
use crate::grammar::Grammar;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// An integer choosing which alternative to expand for one occurrence of a
/// non-terminal.
pub type Codon = usize;

/// Multi-chromosome genotype: one growable codon sequence per grammar
/// non-terminal, indexed by the non-terminal's stable chromosome index.
///
/// Codon `c` at position `p` of chromosome `i` means "the p-th time
/// non-terminal `i` is expanded during a derivation, take alternative `c`".
/// A genotype never shrinks on its own; mapping appends fresh codons when a
/// derivation consumes past the end of a chromosome (lazy growth, the
/// structured replacement for flat-genome wrapping).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genotype {
    chromosomes: Vec<Vec<Codon>>,
}

impl Genotype {
    /// All-empty chromosomes, one per grammar non-terminal.
    pub fn empty(grammar: &Grammar) -> Self {
        Self {
            chromosomes: vec![Vec::new(); grammar.non_terminal_count()],
        }
    }

    pub fn from_chromosomes(chromosomes: Vec<Vec<Codon>>) -> Self {
        Self { chromosomes }
    }

    /// Random genotype built by depth-bounded expansion from the start
    /// symbol. Unlike mapping, creation always appends a fresh codon, so
    /// every chromosome ends up exactly as long as the number of times its
    /// non-terminal was expanded. Returns the maximum derivation depth.
    pub fn random<R: Rng>(
        grammar: &Grammar,
        max_init_depth: usize,
        rng: &mut R,
    ) -> Result<(Self, usize)> {
        let mut genotype = Self::empty(grammar);
        let depth = grow(grammar, &mut genotype, grammar.start_index(), 0, max_init_depth, rng)?;
        Ok((genotype, depth))
    }

    /// Number of chromosomes (= grammar non-terminals).
    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    pub fn chromosome(&self, index: usize) -> &[Codon] {
        &self.chromosomes[index]
    }

    pub fn chromosomes(&self) -> &[Vec<Codon>] {
        &self.chromosomes
    }

    pub fn push_codon(&mut self, index: usize, codon: Codon) {
        self.chromosomes[index].push(codon);
    }

    pub fn set_codon(&mut self, index: usize, position: usize, codon: Codon) {
        self.chromosomes[index][position] = codon;
    }
}

fn grow<R: Rng>(
    grammar: &Grammar,
    genotype: &mut Genotype,
    nt_index: usize,
    depth: usize,
    max_init_depth: usize,
    rng: &mut R,
) -> Result<usize> {
    let choice = synthesize_codon(grammar, nt_index, depth, max_init_depth, rng)?;
    genotype.push_codon(nt_index, choice);

    let mut deepest = depth;
    for symbol in &grammar.alternatives(nt_index)[choice] {
        if symbol.is_terminal() {
            continue;
        }
        let child = grammar
            .index_of(&symbol.text)
            .ok_or_else(|| GramevoError::UnreachableTermination(symbol.text.clone()))?;
        deepest = deepest.max(grow(grammar, genotype, child, depth + 1, max_init_depth, rng)?);
    }
    Ok(deepest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grammar() -> Grammar {
        Grammar::parse(
            "<expr> ::= <expr><op><expr> | <var>\n<op> ::= + | *\n<var> ::= x | y",
            false,
        )
        .unwrap()
    }

    #[test]
    fn creation_lengths_match_expansion_counts() {
        let grammar = grammar();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let (genotype, _) = Genotype::random(&grammar, 4, &mut rng).unwrap();
            let expr = genotype.chromosome(0).len();
            let op = genotype.chromosome(1).len();
            let var = genotype.chromosome(2).len();
            // Every recursive <expr> choice adds one <op> and splits into two
            // more <expr> expansions; every leaf choice adds one <var>.
            assert_eq!(expr, op + var);
            assert_eq!(var, op + 1);
        }
    }

    #[test]
    fn creation_respects_init_depth_bound() {
        let grammar = grammar();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let (_, depth) = Genotype::random(&grammar, 3, &mut rng).unwrap();
            // Recursive choices are allowed through depth 3; the forced
            // non-recursive <expr> -> <var> expansion at depth 4 reaches
            // <var> at depth 5 and stops there.
            assert!(depth <= 5, "depth {depth} escaped the bound");
        }
    }

    #[test]
    fn creation_fails_when_no_alternative_terminates() {
        let grammar = Grammar::parse("<loop> ::= a<loop> | b<loop>", false).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let err = Genotype::random(&grammar, 2, &mut rng).unwrap_err();
        assert!(matches!(err, GramevoError::UnreachableTermination(_)));
    }
}
