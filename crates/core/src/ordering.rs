use std::collections::BTreeMap;

use crate::{Create, ResolveError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

/// Reorders `creates` so that every dependency precedes its dependents.
///
/// Depth-first visit in input order with dependencies already sorted per
/// create, so the result is deterministic for a given input order. On a
/// missing name or a cycle the input order is left untouched and the error
/// carries the position of the triggering reference.
pub(crate) fn sort_creates(creates: &mut Vec<Create>) -> Result<(), ResolveError> {
    let order = {
        let mut index_by_name = BTreeMap::new();
        for (index, create) in creates.iter().enumerate() {
            index_by_name
                .entry(create.quoted_name.as_str())
                .or_insert(index);
        }

        let mut marks = vec![Mark::Unvisited; creates.len()];
        let mut order = Vec::with_capacity(creates.len());
        for index in 0..creates.len() {
            if marks[index] == Mark::Unvisited {
                visit(creates, &index_by_name, &mut marks, &mut order, index)?;
            }
        }
        order
    };

    let mut slots = std::mem::take(creates)
        .into_iter()
        .map(Some)
        .collect::<Vec<_>>();
    for index in order {
        if let Some(create) = slots[index].take() {
            creates.push(create);
        }
    }
    Ok(())
}

fn visit(
    creates: &[Create],
    index_by_name: &BTreeMap<&str, usize>,
    marks: &mut [Mark],
    order: &mut Vec<usize>,
    index: usize,
) -> Result<(), ResolveError> {
    marks[index] = Mark::Visiting;
    for dep in &creates[index].deps {
        let Some(&target) = index_by_name.get(dep.name.as_str()) else {
            return Err(ResolveError::NotFound {
                name: dep.name.clone(),
                pos: dep.pos.clone(),
            });
        };
        match marks[target] {
            Mark::Visiting => {
                return Err(ResolveError::Cycle {
                    name: dep.name.clone(),
                    pos: dep.pos.clone(),
                });
            }
            Mark::Visited => {}
            Mark::Unvisited => visit(creates, index_by_name, marks, order, target)?,
        }
    }
    marks[index] = Mark::Visited;
    order.push(index);
    Ok(())
}
