//! The tools offered to the assistant. Each runs one query and answers in a
//! few lines of plain text.

use std::fmt::Write;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::{
    error::Result,
    model::{
        api::{
            beneficiary::BeneficiaryQuery, fields, pagination::PaginationRequest,
            project::ProjectQuery, voter::VoterQuery,
        },
        common::{BeneficiaryStatus, Mobile, Module, ProjectStatus},
        db::{
            beneficiary::Beneficiary, programme::ProgrammeItem, project::Project,
            service::Service, visitor::Visitor, vote_mark::VoteMark, voter::Voter,
        },
        mongodb::Coll,
    },
};

use super::{
    tool::{AsyncTool, ToolContext},
    toolset::{ToolSet, ToolSetCreationError},
};

/// Most rows listed in one answer.
const MAX_LISTED: u32 = 20;
const DEFAULT_LISTED: u32 = 10;

/// `n` followed by the noun, pluralised with a trailing "s".
fn counted(n: impl Into<u64>, noun: &str) -> String {
    let n = n.into();
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Every tool the assistant may use.
pub fn toolset() -> std::result::Result<ToolSet, ToolSetCreationError> {
    ToolSet::new()
        .add_tool::<SearchVoters>()?
        .add_tool::<VoterDetails>()?
        .add_tool::<BeneficiarySummary>()?
        .add_tool::<ListProjects>()?
        .add_tool::<ProgrammeForDate>()?
        .add_tool::<VisitorsByContact>()
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchVoters {
    #[schemars(description = "Part of a name, the start of an EPIC number, or mobile digits")]
    pub query: String,
    #[schemars(description = "Only search this part")]
    pub part_no: Option<u32>,
    #[schemars(description = "How many voters to list, at most 20. Defaults to 10.")]
    pub limit: Option<u32>,
}

#[rocket::async_trait]
impl AsyncTool for SearchVoters {
    const NAME: &'static str = "searchVoters";
    const DESCRIPTION: &'static str =
        "Search the voter roll by name, EPIC number or mobile number, optionally within one part.";
    const MODULE: Module = Module::Voters;

    async fn call(&self, ctx: &ToolContext) -> Result<String> {
        let query = VoterQuery {
            q: Some(fields::required("query", &self.query)?),
            part_no: self.part_no,
            ..Default::default()
        };
        let limit = self.limit.unwrap_or(DEFAULT_LISTED).clamp(1, MAX_LISTED);
        let (voters, total) = Voter::search(
            &Coll::from_db(&ctx.db),
            query.to_filter(),
            PaginationRequest::new(1, limit),
        )
        .await?;
        Ok(summarise_voters(self.query.trim(), total, &voters))
    }
}

fn summarise_voters(query: &str, total: u64, voters: &[Voter]) -> String {
    if voters.is_empty() {
        return format!("No voters match '{query}'.");
    }
    let verb = if total == 1 { "matches" } else { "match" };
    let mut summary = format!("{} {verb} '{query}'", counted(total, "voter"));
    if (voters.len() as u64) < total {
        let _ = write!(summary, ", showing the first {}", voters.len());
    }
    summary.push(':');
    for voter in voters {
        let _ = write!(
            summary,
            "\n- {} ({}), part {}",
            voter.name, voter.epic_number, voter.part_no
        );
        if let Some(age) = voter.age {
            let _ = write!(summary, ", age {age}");
        }
    }
    summary
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoterDetails {
    #[schemars(description = "The voter's EPIC number")]
    pub epic_number: String,
}

#[rocket::async_trait]
impl AsyncTool for VoterDetails {
    const NAME: &'static str = "voterDetails";
    const DESCRIPTION: &'static str =
        "Look up one voter by EPIC number, with their family and voting history.";
    const MODULE: Module = Module::Voters;

    async fn call(&self, ctx: &ToolContext) -> Result<String> {
        let epic_number = fields::epic("epicNumber", &self.epic_number)?;
        let voters = Coll::<Voter>::from_db(&ctx.db);
        let Some(voter) = Voter::find(&voters, &epic_number).await? else {
            return Ok(format!("No voter has EPIC number {epic_number}."));
        };
        let family = voter.family(&voters).await?;
        let history = VoteMark::history(&Coll::from_db(&ctx.db), &epic_number).await?;
        Ok(summarise_voter(&voter, &family, &history))
    }
}

fn summarise_voter(voter: &Voter, family: &[Voter], history: &[VoteMark]) -> String {
    let mut summary = format!("{} ({})", voter.name, voter.epic_number);
    if let Some(relation) = &voter.relation_name {
        let _ = write!(summary, ", relative {relation}");
    }
    if let Some(age) = voter.age {
        let _ = write!(summary, ", age {age}");
    }
    let _ = write!(summary, ". Part {}", voter.part_no);
    if let Some(ward_no) = voter.ward_no {
        let _ = write!(summary, ", ward {ward_no}");
    }
    if let Some(booth_no) = voter.booth_no {
        let _ = write!(summary, ", booth {booth_no}");
    }
    if let Some(house_no) = &voter.house_no {
        let _ = write!(summary, ", house {house_no}");
    }
    summary.push('.');
    if !voter.mobile_numbers.is_empty() {
        let numbers: Vec<&str> = voter.mobile_numbers.iter().map(|m| &**m).collect();
        let _ = write!(summary, " Mobile: {}.", numbers.join(", "));
    }

    let others: Vec<&str> = family
        .iter()
        .filter(|member| member.epic_number != voter.epic_number)
        .map(|member| member.name.as_str())
        .collect();
    if !others.is_empty() {
        let _ = write!(summary, " Family: {}.", others.join(", "));
    }

    if history.is_empty() {
        summary.push_str(" No votes recorded.");
    } else {
        let voted = history.iter().filter(|mark| mark.has_voted).count();
        let _ = write!(
            summary,
            " Voted in {voted} of {}.",
            counted(history.len() as u64, "recorded election")
        );
    }
    summary
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BeneficiarySummary {
    #[schemars(description = "Only count requests for this service ID")]
    pub service_id: Option<String>,
    #[schemars(description = "Only count requests for this part")]
    pub part_no: Option<u32>,
}

#[rocket::async_trait]
impl AsyncTool for BeneficiarySummary {
    const NAME: &'static str = "beneficiarySummary";
    const DESCRIPTION: &'static str =
        "Count service requests by status, for every service or just one, optionally within one part.";
    const MODULE: Module = Module::Beneficiaries;

    async fn call(&self, ctx: &ToolContext) -> Result<String> {
        let filter = BeneficiaryQuery {
            service_id: self.service_id.clone(),
            part_no: self.part_no,
            ..Default::default()
        }
        .to_filter()?;

        let mut scope = match &self.service_id {
            Some(service_id) => {
                let service_id = fields::id("serviceId", service_id)?;
                match Service::find(&Coll::from_db(&ctx.db), service_id).await? {
                    Some(service) => format!("'{}'", service.name),
                    None => return Ok(format!("No service has ID {service_id}.")),
                }
            }
            None => "all services".to_string(),
        };
        if let Some(part_no) = self.part_no {
            let _ = write!(scope, " in part {part_no}");
        }

        let counts = Beneficiary::count_by_status(&Coll::from_db(&ctx.db), filter).await?;
        Ok(summarise_beneficiaries(&scope, &counts))
    }
}

fn summarise_beneficiaries(scope: &str, counts: &[(BeneficiaryStatus, u64)]) -> String {
    let total: u64 = counts.iter().map(|(_, count)| count).sum();
    if total == 0 {
        return format!("No requests recorded for {scope}.");
    }
    let parts: Vec<String> = counts
        .iter()
        .map(|(status, count)| format!("{count} {}", status.label()))
        .collect();
    format!("{} for {scope}: {}.", counted(total, "request"), parts.join(", "))
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListProjects {
    #[schemars(description = "Only list projects in this ward")]
    pub ward_no: Option<u32>,
    #[schemars(description = "Only list projects with this status")]
    pub status: Option<ProjectStatus>,
}

#[rocket::async_trait]
impl AsyncTool for ListProjects {
    const NAME: &'static str = "listProjects";
    const DESCRIPTION: &'static str =
        "List public-works projects, most recently updated first, by ward and status.";
    const MODULE: Module = Module::Projects;

    async fn call(&self, ctx: &ToolContext) -> Result<String> {
        let filter = ProjectQuery {
            ward_no: self.ward_no,
            status: self.status,
        }
        .to_filter();
        let projects = Project::list(&Coll::from_db(&ctx.db), filter).await?;
        Ok(summarise_projects(&projects))
    }
}

fn summarise_projects(projects: &[Project]) -> String {
    if projects.is_empty() {
        return "No projects found.".to_string();
    }
    let mut summary = format!("{}:", counted(projects.len() as u64, "project"));
    for project in projects.iter().take(MAX_LISTED as usize) {
        let _ = write!(summary, "\n- {} [{}]", project.name, project.status.label());
        if let Some(ward_no) = project.ward_no {
            let _ = write!(summary, ", ward {ward_no}");
        }
        if let Some(owner) = &project.owner {
            let _ = write!(summary, ", {owner}");
        }
        if let Some(cost) = project.estimated_cost {
            let _ = write!(summary, ", estimated {cost:.0}");
        }
    }
    if projects.len() > MAX_LISTED as usize {
        let _ = write!(summary, "\n...and {} more.", projects.len() - MAX_LISTED as usize);
    }
    summary
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgrammeForDate {
    #[schemars(description = "The day, as YYYY-MM-DD. Defaults to today.")]
    pub date: Option<String>,
}

#[rocket::async_trait]
impl AsyncTool for ProgrammeForDate {
    const NAME: &'static str = "programmeForDate";
    const DESCRIPTION: &'static str = "The daily programme of engagements for one day.";
    const MODULE: Module = Module::Programme;

    async fn call(&self, ctx: &ToolContext) -> Result<String> {
        let date = match &self.date {
            Some(date) => fields::date("date", date)?,
            None => ctx.today,
        };
        let items = ProgrammeItem::for_date(&Coll::from_db(&ctx.db), date).await?;
        Ok(summarise_programme(date, &items))
    }
}

fn summarise_programme(date: NaiveDate, items: &[ProgrammeItem]) -> String {
    if items.is_empty() {
        return format!("Nothing is scheduled for {date}.");
    }
    let mut summary = format!("Programme for {date}:");
    for item in items {
        let _ = write!(summary, "\n- {}", item.start_time.format("%H:%M"));
        if let Some(end_time) = item.end_time {
            let _ = write!(summary, "-{}", end_time.format("%H:%M"));
        }
        let _ = write!(summary, " {}", item.title);
        if let Some(location) = &item.location {
            let _ = write!(summary, " at {location}");
        }
    }
    summary
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitorsByContact {
    #[schemars(description = "The visitor's phone number")]
    pub contact_no: String,
}

#[rocket::async_trait]
impl AsyncTool for VisitorsByContact {
    const NAME: &'static str = "visitorsByContact";
    const DESCRIPTION: &'static str = "Earlier office visits from one phone number, newest first.";
    const MODULE: Module = Module::Visitors;

    async fn call(&self, ctx: &ToolContext) -> Result<String> {
        let contact_no = fields::mobile("contactNo", &self.contact_no)?;
        let visits = Visitor::by_contact(&Coll::from_db(&ctx.db), &contact_no).await?;
        Ok(summarise_visits(&contact_no, &visits))
    }
}

fn summarise_visits(contact_no: &Mobile, visits: &[Visitor]) -> String {
    if visits.is_empty() {
        return format!("No visits recorded from {contact_no}.");
    }
    let mut summary = format!("{} from {contact_no}:", counted(visits.len() as u64, "visit"));
    for visit in visits.iter().take(MAX_LISTED as usize) {
        let _ = write!(
            summary,
            "\n- {} {}: {}",
            visit.visit_date, visit.name, visit.purpose
        );
    }
    summary
}
