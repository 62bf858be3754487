//! Plain-text checkpoints.
//!
//! ```text
//! <population size> <generation>
//! <resource type count>
//! <tuple count>
//! g g g ... +        one line per table, genes in (type, tuple) order
//! ```
//!
//! Checkpoints are for resuming a run on the same model only; loaded tables
//! are dirty and get evaluated by the solver.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::str::SplitWhitespace;

use tracing::info;

use crate::error::{Result, ResultExt, SolverError};
use crate::model::Problem;

use super::{Chromosome, Population, Table};

const TABLE_END: &str = "+";

impl Population {
    /// Writes the population in checkpoint format.
    pub fn save<W: Write>(&self, mut writer: W) -> Result<()> {
        let first = self.best().ok_or(SolverError::EmptyPopulation)?;
        writeln!(writer, "{} {}", self.len(), self.generation())?;
        writeln!(writer, "{}", first.type_count())?;
        writeln!(writer, "{}", first.tuple_count())?;

        for table in self.tables() {
            for chromosome in table.chromosomes() {
                for gene in chromosome.genes() {
                    write!(writer, "{} ", gene)?;
                }
            }
            writeln!(writer, "{}", TABLE_END)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())
            .context(format!("creating checkpoint {}", path.as_ref().display()))?;
        self.save(BufWriter::new(file))?;
        info!(path = %path.as_ref().display(), generation = self.generation(), "population saved");
        Ok(())
    }

    /// Reads a checkpoint and validates it against `problem`.
    pub fn load<R: Read>(problem: &Problem, mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let mut tokens = text.split_whitespace();

        let size = next_number(&mut tokens, "population size")?;
        let generation = next_number(&mut tokens, "generation counter")? as u64;
        let type_count = next_number(&mut tokens, "resource type count")?;
        let tuple_count = next_number(&mut tokens, "tuple count")?;

        if size == 0 {
            return Err(SolverError::Resume("checkpoint holds no tables".to_string()));
        }
        if type_count != problem.type_count() || tuple_count != problem.tuple_count() {
            return Err(SolverError::Resume(format!(
                "checkpoint is for {} types and {} tuples, problem has {} types and {} tuples",
                type_count,
                tuple_count,
                problem.type_count(),
                problem.tuple_count()
            )));
        }

        // Every table takes one token per gene plus its end marker.
        let per_table = type_count * tuple_count + 1;
        let available = tokens.clone().count() / per_table;
        if size > available {
            return Err(SolverError::Resume(format!(
                "checkpoint announces {} tables but holds at most {}",
                size, available
            )));
        }

        let mut tables = Vec::new();
        tables
            .try_reserve_exact(size)
            .map_err(|e| SolverError::Allocation(format!("population of {}: {}", size, e)))?;

        for n in 0..size {
            let mut chromosomes = Vec::with_capacity(type_count);
            for type_id in 0..type_count {
                let mut chromosome = Chromosome::zeroed(type_id, tuple_count)?;
                for gene in chromosome.genes_mut() {
                    *gene = next_number(&mut tokens, "gene")?;
                }
                chromosomes.push(chromosome);
            }

            match tokens.next() {
                Some(TABLE_END) => {}
                other => {
                    return Err(SolverError::Resume(format!(
                        "table {} is not terminated by '{}' (found {:?})",
                        n, TABLE_END, other
                    )))
                }
            }
            tables.push(Table::from_chromosomes(chromosomes));
        }

        let population = Population::from_tables(tables, generation);
        population.validate(problem)?;
        Ok(population)
    }

    pub fn load_from_path<P: AsRef<Path>>(problem: &Problem, path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .context(format!("opening checkpoint {}", path.as_ref().display()))?;
        let population = Self::load(problem, file)?;
        info!(
            path = %path.as_ref().display(),
            size = population.len(),
            generation = population.generation(),
            "population restored"
        );
        Ok(population)
    }
}

fn next_number(tokens: &mut SplitWhitespace<'_>, what: &str) -> Result<usize> {
    let token = tokens
        .next()
        .ok_or_else(|| SolverError::Resume(format!("unexpected end of file reading {}", what)))?;
    token
        .parse()
        .map_err(|_| SolverError::Resume(format!("invalid {} '{}'", what, token)))
}
