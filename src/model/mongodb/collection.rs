use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    beneficiary::{Beneficiary, NewBeneficiary},
    programme::{NewProgrammeItem, ProgrammeItem},
    project::{NewProject, Project},
    reference::{Booth, Election, Part},
    role::{NewRole, Role},
    service::{NewService, Service},
    user::{NewUser, User},
    visitor::{NewVisitor, Visitor},
    vote_mark::VoteMark,
    voter::Voter,
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

/// Implement [`MongoCollection`] for every listed type, all sharing one name.
macro_rules! collection {
    ($name:expr => $($ty:ty),+) => {
        $(
            impl MongoCollection for $ty {
                const NAME: &'static str = $name;
            }
        )+
    };
}

collection!("users" => User, NewUser);
collection!("roles" => Role, NewRole);
collection!("voters" => Voter);
collection!("vote_marks" => VoteMark);
collection!("elections" => Election);
collection!("booths" => Booth);
collection!("parts" => Part);
collection!("services" => Service, NewService);
collection!("beneficiaries" => Beneficiary, NewBeneficiary);
collection!("visitors" => Visitor, NewVisitor);
collection!("programme" => ProgrammeItem, NewProgrammeItem);
collection!("projects" => Project, NewProject);

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();
    let index = |keys, unique: Option<&IndexOptions>| {
        IndexModel::builder()
            .keys(keys)
            .options(unique.cloned())
            .build()
    };

    Coll::<User>::from_db(db)
        .create_index(index(doc! {"username": 1}, Some(&unique)), None)
        .await?;
    Coll::<Role>::from_db(db)
        .create_index(index(doc! {"name": 1}, Some(&unique)), None)
        .await?;

    // One mark per voter per election; marking is an upsert on this key.
    let marks = Coll::<VoteMark>::from_db(db);
    marks
        .create_index(
            index(doc! {"epic_number": 1, "election_id": 1}, Some(&unique)),
            None,
        )
        .await?;
    marks
        .create_index(index(doc! {"election_id": 1, "part_no": 1}, None), None)
        .await?;

    let voters = Coll::<Voter>::from_db(db);
    for keys in [
        doc! {"part_no": 1},
        doc! {"family_id": 1},
        doc! {"mobile_numbers": 1},
    ] {
        voters.create_index(index(keys, None), None).await?;
    }

    let beneficiaries = Coll::<Beneficiary>::from_db(db);
    for keys in [doc! {"service_id": 1}, doc! {"status": 1}] {
        beneficiaries.create_index(index(keys, None), None).await?;
    }

    Coll::<Visitor>::from_db(db)
        .create_index(index(doc! {"contact_no": 1}, None), None)
        .await?;
    Coll::<ProgrammeItem>::from_db(db)
        .create_index(index(doc! {"date": 1, "start_time": 1}, None), None)
        .await?;
    Coll::<Project>::from_db(db)
        .create_index(index(doc! {"ward_no": 1}, None), None)
        .await?;

    Ok(())
}
