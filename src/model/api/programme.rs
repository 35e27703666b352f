use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::{fields, id::ApiId},
        db::programme::{NewProgrammeItem, ProgrammeItem},
        mongodb::Id,
    },
};

/// Longest range a single listing may cover.
pub const MAX_RANGE_DAYS: i64 = 366;

/// Request body for creating or replacing a programme item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgrammeRequest {
    pub title: String,
    pub description: Option<String>,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// `HH:MM`.
    pub start_time: String,
    pub end_time: Option<String>,
    pub location: Option<String>,
}

impl ProgrammeRequest {
    pub fn into_new(self, created_by: Id) -> Result<NewProgrammeItem> {
        let date = fields::date("date", &self.date)?;
        let start_time = fields::time("start_time", &self.start_time)?;
        let end_time = self
            .end_time
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| fields::time("end_time", t))
            .transpose()?;
        if let Some(end_time) = end_time {
            if end_time < start_time {
                return Err(Error::bad_request("end_time must not be before start_time"));
            }
        }
        Ok(NewProgrammeItem {
            title: fields::required("title", &self.title)?,
            description: fields::optional(self.description),
            date,
            start_time,
            end_time,
            location: fields::optional(self.location),
            created_by,
            updated_at: Utc::now(),
        })
    }
}

/// Either one date, or a `from`..=`to` range. Defaults to today.
#[derive(Debug, Clone, Default)]
pub struct ProgrammeQuery {
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl ProgrammeQuery {
    pub fn to_filter(&self, today: NaiveDate) -> Result<Document> {
        let (from, to) = match (&self.date, &self.from, &self.to) {
            (Some(date), None, None) => {
                let date = fields::date("date", date)?;
                (date, date)
            }
            (None, Some(from), Some(to)) => (fields::date("from", from)?, fields::date("to", to)?),
            (None, None, None) => (today, today),
            _ => {
                return Err(Error::bad_request(
                    "Give either date, or both from and to",
                ))
            }
        };
        if to < from {
            return Err(Error::bad_request("to must not be before from"));
        }
        if (to - from).num_days() > MAX_RANGE_DAYS {
            return Err(Error::bad_request(format!(
                "A range may cover at most {MAX_RANGE_DAYS} days"
            )));
        }
        Ok(ProgrammeItem::range_filter(from, to))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammeView {
    pub id: ApiId,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub created_by: ApiId,
    pub updated_at: DateTime<Utc>,
}

impl From<ProgrammeItem> for ProgrammeView {
    fn from(item: ProgrammeItem) -> Self {
        let core = item.item;
        Self {
            id: item.id.into(),
            title: core.title,
            description: core.description,
            date: core.date,
            start_time: core.start_time,
            end_time: core.end_time,
            location: core.location,
            created_by: core.created_by.into(),
            updated_at: core.updated_at,
        }
    }
}

/// Build the `$set` replacing an item's fields, from an already validated item.
pub fn replacement(item: &NewProgrammeItem) -> Document {
    doc! {
        "$set": {
            "title": item.title.clone(),
            "description": item.description.clone(),
            "date": item.date.to_string(),
            "start_time": item.start_time.to_string(),
            "end_time": item.end_time.map(|t| t.to_string()),
            "location": item.location.clone(),
            "updated_at": item.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn request() -> ProgrammeRequest {
        ProgrammeRequest {
            title: "Grievance camp".to_string(),
            date: "2026-10-18".to_string(),
            start_time: "10:00".to_string(),
            end_time: Some("12:30".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn times_are_checked() {
        let item = request().into_new(Id::new()).unwrap();
        assert_eq!(item.date, day(18));
        assert_eq!(item.end_time, NaiveTime::from_hms_opt(12, 30, 0));

        let backwards = ProgrammeRequest {
            end_time: Some("09:00".to_string()),
            ..request()
        };
        assert!(backwards.into_new(Id::new()).is_err());

        let blank_end = ProgrammeRequest {
            end_time: Some("".to_string()),
            ..request()
        };
        assert_eq!(blank_end.into_new(Id::new()).unwrap().end_time, None);
    }

    #[test]
    fn query_ranges() {
        assert_eq!(
            ProgrammeQuery::default().to_filter(day(18)).unwrap(),
            ProgrammeItem::range_filter(day(18), day(18))
        );
        let range = ProgrammeQuery {
            from: Some("2026-10-01".to_string()),
            to: Some("2026-10-07".to_string()),
            ..Default::default()
        };
        assert_eq!(
            range.to_filter(day(18)).unwrap(),
            ProgrammeItem::range_filter(day(1), day(7))
        );

        let half = ProgrammeQuery {
            from: Some("2026-10-01".to_string()),
            ..Default::default()
        };
        assert!(half.to_filter(day(18)).is_err());

        let reversed = ProgrammeQuery {
            from: Some("2026-10-07".to_string()),
            to: Some("2026-10-01".to_string()),
            ..Default::default()
        };
        assert!(reversed.to_filter(day(18)).is_err());
    }

    #[test]
    fn replacement_matches_stored_form() {
        let item = request().into_new(Id::new()).unwrap();
        let stored = mongodb::bson::to_document(&item).unwrap();
        let set = replacement(&item);
        let set = set.get_document("$set").unwrap();
        for key in ["title", "date", "start_time", "end_time"] {
            assert_eq!(set.get(key), stored.get(key), "{key}");
        }
    }
}
