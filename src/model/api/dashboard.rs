use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{
    api::programme::ProgrammeView,
    common::{BeneficiaryStatus, ProjectStatus},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount<S> {
    pub status: S,
    pub count: u64,
}

impl<S> From<(S, u64)> for StatusCount<S> {
    fn from((status, count): (S, u64)) -> Self {
        Self { status, count }
    }
}

/// Headline numbers for the landing page.
#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardView {
    pub date: NaiveDate,
    pub voters: u64,
    pub beneficiaries: Vec<StatusCount<BeneficiaryStatus>>,
    pub projects: Vec<StatusCount<ProjectStatus>>,
    pub visitors_today: u64,
    pub programme_today: Vec<ProgrammeView>,
}
