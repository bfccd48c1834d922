use std::collections::HashMap;

use crate::reconstruct::{reconstruct, ReconstructOptions};
use crate::types::{Plan, PostInfo};
use crate::unit::DownloadUnit;

/// Maps fee amounts to the creator's plan titles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanNames {
    names: HashMap<u32, String>,
}

impl PlanNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_plans(plans: &[Plan]) -> Self {
        plans
            .iter()
            .map(|plan| (plan.fee, plan.title.clone()))
            .collect()
    }

    /// Plan title for `fee`, or a generated name when the fee is unknown.
    pub fn tag_by_fee(&self, fee: u32) -> String {
        match self.names.get(&fee) {
            Some(name) => name.clone(),
            None if fee > 0 => format!("{fee}円プラン"),
            None => "無料プラン".to_string(),
        }
    }
}

impl FromIterator<(u32, String)> for PlanNames {
    fn from_iter<T: IntoIterator<Item = (u32, String)>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// Accumulates reconstructed posts into one [`DownloadUnit`].
#[derive(Debug, Clone)]
pub struct Aggregator {
    unit: DownloadUnit,
    plans: PlanNames,
    options: ReconstructOptions,
    /// Remaining budget; `None` means unlimited.
    limit: Option<u32>,
}

impl Aggregator {
    pub fn new(creator_id: &str, plans: PlanNames, options: ReconstructOptions) -> Self {
        let mut unit = DownloadUnit::new(creator_id);
        unit.set_url(format!("https://www.fanbox.cc/@{creator_id}"));
        Self {
            unit,
            plans,
            options,
            limit: None,
        }
    }

    pub fn creator_id(&self) -> &str {
        &self.unit.id
    }

    pub fn unit(&self) -> &DownloadUnit {
        &self.unit
    }

    /// Sets the post budget. `None` or zero disables it.
    pub fn set_limit(&mut self, limit: Option<u32>) {
        self.limit = limit.filter(|n| *n > 0);
    }

    pub fn is_limit_valid(&self) -> bool {
        self.limit.map_or(true, |remaining| remaining > 0)
    }

    pub fn decrement_limit(&mut self) {
        if let Some(remaining) = self.limit.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
    }

    pub fn add_fee(&mut self, fee: u32) {
        self.unit.fees.insert(fee);
    }

    pub fn add_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unit
            .discovered_tags
            .extend(tags.into_iter().map(Into::into));
    }

    pub fn tag_by_fee(&self, fee: u32) -> String {
        self.plans.tag_by_fee(fee)
    }

    /// Reconstructs and appends a post. Returns whether it was accepted.
    ///
    /// Refused once the budget is exhausted.
    pub fn add_post(&mut self, post: &PostInfo) -> bool {
        if !self.is_limit_valid() {
            return false;
        }
        let Some(reconstructed) = reconstruct(post, &self.plans, &self.options) else {
            return false;
        };
        self.unit.push_post(reconstructed.entry);
        self.add_fee(reconstructed.fee);
        self.add_tags(post.tags.iter().cloned());
        self.decrement_limit();
        true
    }

    /// Resolves the final tag list: fee tags ascending by fee, then the other
    /// discovered tags in discovery order.
    pub fn apply_tags(&mut self) {
        let mut fees: Vec<u32> = self.unit.fees.iter().copied().collect();
        fees.sort_unstable();
        let mut tags: Vec<String> = Vec::new();
        for fee in fees {
            let tag = self.tag_by_fee(fee);
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        let fee_tag_count = tags.len();
        for tag in &self.unit.discovered_tags {
            if !tags[..fee_tag_count].contains(tag) {
                tags.push(tag.clone());
            }
        }
        self.unit.tags = tags;
    }

    /// Finalizes the tags and hands over the unit.
    pub fn finish(mut self) -> DownloadUnit {
        self.apply_tags();
        self.unit
    }
}
