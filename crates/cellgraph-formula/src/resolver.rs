//! Reference resolution against a populated graph
//!
//! Turns the references of a formula into the ids of existing cell nodes.
//! Unqualified references are resolved in the formula's own sheet; qualified
//! ones in the sheet they name. Column ranges are matched by comparing
//! column letters as strings, so `A:J` also matches column `AA` and `J:AA`
//! matches nothing.

use crate::lexer::{Reference, ReferenceLexer};
use cellgraph_core::{cell_id, column_part, Graph};
use std::collections::BTreeSet;

/// Outcome of resolving one formula
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedReferences {
    /// Ids of existing cells the formula depends on
    pub targets: BTreeSet<String>,
    /// References that matched no cell
    pub unresolved: Vec<Reference>,
}

impl ResolvedReferences {
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Resolves formula references against the cells present in a graph
pub struct ReferenceResolver<'g> {
    graph: &'g Graph,
}

impl<'g> ReferenceResolver<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self { graph }
    }

    /// Same-sheet cell references of `formula`, looked up in `home_sheet`
    ///
    /// Bare column ranges are reported as unresolved; they never expand.
    pub fn resolve_unqualified(&self, formula: &str, home_sheet: &str) -> ResolvedReferences {
        let mut resolved = ResolvedReferences::default();

        for reference in ReferenceLexer::new(formula).filter(|r| !r.is_qualified()) {
            let found = match &reference {
                Reference::BareCell(cell) => self.lookup(home_sheet, cell, &mut resolved.targets),
                _ => false,
            };
            if !found {
                resolved.unresolved.push(reference);
            }
        }
        resolved
    }

    /// Sheet-qualified references of `formula`: single cells and column ranges
    pub fn resolve_qualified(&self, formula: &str) -> ResolvedReferences {
        let mut resolved = ResolvedReferences::default();

        for reference in ReferenceLexer::new(formula).filter(Reference::is_qualified) {
            let found = match &reference {
                Reference::QualifiedCell { sheet, cell } => {
                    self.lookup(sheet, cell, &mut resolved.targets)
                }
                Reference::QualifiedRange { sheet, start, end } => {
                    let before = resolved.targets.len();
                    resolved
                        .targets
                        .extend(self.column_range(sheet, start, end).map(str::to_string));
                    resolved.targets.len() > before
                }
                _ => false,
            };
            if !found {
                resolved.unresolved.push(reference);
            }
        }
        resolved
    }

    /// Every reference of `formula` as seen from `home_sheet`, unqualified
    /// and qualified together
    pub fn resolve_all(&self, formula: &str, home_sheet: &str) -> ResolvedReferences {
        let mut resolved = self.resolve_unqualified(formula, home_sheet);
        let qualified = self.resolve_qualified(formula);
        resolved.targets.extend(qualified.targets);
        resolved.unresolved.extend(qualified.unresolved);
        resolved
    }

    /// Cells of `sheet` whose column letters fall in `start..=end` as strings
    pub fn column_range<'a>(
        &'a self,
        sheet: &'a str,
        start: &'a str,
        end: &'a str,
    ) -> impl Iterator<Item = &'g str> + 'a {
        self.graph
            .cells_in_sheet(sheet)
            .filter(move |c| {
                let column = column_part(c.a1_notation());
                column >= start && column <= end
            })
            .map(|c| c.id())
    }

    fn lookup(&self, sheet: &str, cell: &str, targets: &mut BTreeSet<String>) -> bool {
        let id = cell_id(sheet, cell);
        let found = self.graph.cell(&id).is_some();
        if found {
            targets.insert(id);
        }
        found
    }
}
