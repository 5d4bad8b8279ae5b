use std::{collections::BTreeMap, fmt};

use crate::schema::{CartPart, ShoppingListLine};

/*
Shopping list aggregation

Parts are grouped by (ingredient name, measurement unit), not by ingredient id,
so two ingredient rows sharing both collapse into one line. Lines come out
ordered by name, then unit.

Flour (g) - 300
*/

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    pub lines: Vec<ShoppingListLine>,
}

impl ShoppingList {
    pub fn aggregate<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = CartPart>,
    {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        parts.into_iter().for_each(|part| {
            *totals
                .entry((part.name, part.measurement_unit))
                .or_insert(0) += i64::from(part.amount);
        });

        let lines = totals
            .into_iter()
            .map(|((name, measurement_unit), amount)| ShoppingListLine {
                name,
                measurement_unit,
                amount,
            })
            .collect();

        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{} ({}) - {}", line.name, line.measurement_unit, line.amount)?;
        }
        Ok(())
    }
}
