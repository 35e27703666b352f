use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{
        api::{fields, id::ApiId},
        common::{EpicNumber, Mobile},
        db::visitor::{NewVisitor, Visitor},
        mongodb::Id,
    },
};

/// Request body for logging a visit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVisitorRequest {
    pub name: String,
    pub contact_no: String,
    pub purpose: String,
    /// `YYYY-MM-DD`; today if absent.
    pub visit_date: Option<String>,
    pub programme_id: Option<String>,
    pub voter_id: Option<String>,
    pub notes: Option<String>,
}

impl NewVisitorRequest {
    pub fn into_new(self, created_by: Id, today: NaiveDate) -> Result<NewVisitor> {
        Ok(NewVisitor {
            name: fields::required("name", &self.name)?,
            contact_no: fields::mobile("contact_no", &self.contact_no)?,
            purpose: fields::required("purpose", &self.purpose)?,
            visit_date: match &self.visit_date {
                Some(date) => fields::date("visit_date", date)?,
                None => today,
            },
            programme_id: self
                .programme_id
                .as_deref()
                .map(|id| fields::id("programme_id", id))
                .transpose()?,
            voter_id: self
                .voter_id
                .as_deref()
                .map(|epic| fields::epic("voter_id", epic))
                .transpose()?,
            notes: fields::optional(self.notes),
            created_by,
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct VisitorQuery {
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
}

impl VisitorQuery {
    pub fn to_filter(&self) -> Result<Document> {
        match &self.date {
            Some(date) => Ok(Visitor::date_filter(fields::date("date", date)?)),
            None => Ok(Document::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorView {
    pub id: ApiId,
    pub name: String,
    pub contact_no: Mobile,
    pub purpose: String,
    pub visit_date: NaiveDate,
    pub programme_id: Option<ApiId>,
    pub voter_id: Option<EpicNumber>,
    pub notes: Option<String>,
    pub created_by: ApiId,
    pub created_at: DateTime<Utc>,
}

impl From<Visitor> for VisitorView {
    fn from(visitor: Visitor) -> Self {
        let core = visitor.visitor;
        Self {
            id: visitor.id.into(),
            name: core.name,
            contact_no: core.contact_no,
            purpose: core.purpose,
            visit_date: core.visit_date,
            programme_id: core.programme_id.map(Into::into),
            voter_id: core.voter_id,
            notes: core.notes,
            created_by: core.created_by.into(),
            created_at: core.created_at,
        }
    }
}
