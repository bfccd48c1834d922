/// Orders the values of an id-keyed mapping by where their ids first appear in
/// `reference`.
///
/// Ids absent from `reference` share the last rank. The sort is stable, so
/// equal ranks keep the iteration order of `entries`.
pub fn resolve<K, V, I>(entries: I, reference: &[K]) -> Vec<V>
where
    I: IntoIterator<Item = (K, V)>,
    K: PartialEq,
{
    let rank = |id: &K| {
        reference
            .iter()
            .position(|candidate| candidate == id)
            .unwrap_or(reference.len())
    };

    let mut ranked: Vec<(usize, V)> = entries
        .into_iter()
        .map(|(id, value)| (rank(&id), value))
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, value)| value).collect()
}
