use crate::engine::genotype::Genotype;
use crate::error::{GramevoError, Result};
use crate::grammar::Grammar;
use rand::Rng;

/// Picks an alternative for one expansion of `nt_index` at `depth`. Below the
/// bound the draw is uniform over all alternatives; past it, uniform over the
/// non-recursive set so the derivation can terminate. The RNG is the only
/// source of randomness, keeping every draw reproducible under a fixed seed.
pub(crate) fn synthesize_codon<R: Rng>(
    grammar: &Grammar,
    nt_index: usize,
    depth: usize,
    max_depth: usize,
    rng: &mut R,
) -> Result<usize> {
    if depth > max_depth {
        let options = grammar.non_recursive_alternatives(nt_index);
        if options.is_empty() {
            return Err(GramevoError::UnreachableTermination(
                grammar.name(nt_index).to_string(),
            ));
        }
        Ok(options[rng.gen_range(0..options.len())])
    } else {
        Ok(rng.gen_range(0..grammar.alternative_count(nt_index)))
    }
}

/// Depth-first, depth-bounded genotype-to-phenotype mapping.
///
/// Deterministic given genotype and cursors: the RNG is consulted only when a
/// cursor runs past the end of its chromosome and a codon must be synthesized
/// and appended (lazy growth). Cursors are mutated in place, so a single
/// genotype must not be mapped by two callers at once.
pub struct DerivationMapper<'a> {
    grammar: &'a Grammar,
    max_depth: usize,
}

impl<'a> DerivationMapper<'a> {
    pub fn new(grammar: &'a Grammar, max_depth: usize) -> Self {
        Self { grammar, max_depth }
    }

    pub fn grammar(&self) -> &Grammar {
        self.grammar
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Expands the start symbol into `(phenotype, max_depth_reached)`.
    /// Callers pass fresh zeroed cursors for a from-scratch mapping.
    pub fn map<R: Rng>(
        &self,
        genotype: &mut Genotype,
        cursors: &mut [usize],
        rng: &mut R,
    ) -> Result<(String, usize)> {
        debug_assert_eq!(cursors.len(), self.grammar.non_terminal_count());
        let mut output = String::new();
        let depth = self.expand(genotype, cursors, self.grammar.start_index(), 0, &mut output, rng)?;
        Ok((self.grammar.format_phenotype(output), depth))
    }

    fn expand<R: Rng>(
        &self,
        genotype: &mut Genotype,
        cursors: &mut [usize],
        nt_index: usize,
        depth: usize,
        output: &mut String,
        rng: &mut R,
    ) -> Result<usize> {
        if cursors[nt_index] >= genotype.chromosome(nt_index).len() {
            let codon = synthesize_codon(self.grammar, nt_index, depth, self.max_depth, rng)?;
            genotype.push_codon(nt_index, codon);
        }
        let codon = genotype.chromosome(nt_index)[cursors[nt_index]];
        cursors[nt_index] += 1;

        // In-crate operators keep codons in range; the modulo only defends
        // genotypes deserialized or built by hand.
        let choice = codon % self.grammar.alternative_count(nt_index);

        let mut deepest = depth;
        for symbol in &self.grammar.alternatives(nt_index)[choice] {
            if symbol.is_terminal() {
                output.push_str(&symbol.text);
                continue;
            }
            let child = self.grammar.index_of(&symbol.text).ok_or_else(|| {
                GramevoError::UnreachableTermination(symbol.text.clone())
            })?;
            deepest = deepest.max(self.expand(genotype, cursors, child, depth + 1, output, rng)?);
        }
        Ok(deepest)
    }
}
