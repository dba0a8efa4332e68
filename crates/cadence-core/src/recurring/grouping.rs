//! Partition transactions into (source, category) groups

use std::collections::BTreeMap;

use crate::models::Transaction;

/// Transactions sharing exactly the same source and category
#[derive(Debug, Clone)]
pub struct TransactionGroup<'a> {
    pub source: &'a str,
    pub category: &'a str,
    /// Members in the order the store returned them
    pub members: Vec<&'a Transaction>,
}

impl TransactionGroup<'_> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Group by exact (source, category) match, dropping groups smaller than `min_size`
///
/// Groups come back sorted by key so repeated runs see them in the same order.
pub fn group_transactions(transactions: &[Transaction], min_size: usize) -> Vec<TransactionGroup<'_>> {
    let mut groups: BTreeMap<(&str, &str), Vec<&Transaction>> = BTreeMap::new();

    for tx in transactions {
        groups
            .entry((tx.source.as_str(), tx.category.as_str()))
            .or_default()
            .push(tx);
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() >= min_size.max(1))
        .map(|((source, category), members)| TransactionGroup {
            source,
            category,
            members,
        })
        .collect()
}
