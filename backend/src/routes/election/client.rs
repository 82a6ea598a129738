use chrono::Utc;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::json::Json;
use rocket::State;
use rocket_db_pools::diesel::prelude::*;
use rocket_db_pools::diesel::AsyncConnection;
use rocket_db_pools::Connection;
use scoped_futures::ScopedFutureExt;
use uuid::Uuid;

use crate::audit;
use crate::config::AppConfig;
use crate::db::ElectionsDb;
use crate::error::ApiError;
use crate::models::{
    join_races, split_races, CandidateOption, CastRequest, CastResponse, LedgerItem,
    LedgerResponse, LedgerRow, MesaLoginRequest, MesaLoginResponse, NewBallot, NewLedgerEntry,
    NewMesaKey, Race, RaceBoard, RaceCard, VerifyRequest, VerifyResponse, Voter,
};
use crate::schema::{ballots, candidates, ledger, mesa_keys, mesas, voters};

/// Session key presented by the mesa operator, if any.
pub struct MesaKey(Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for MesaKey {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(MesaKey(
            req.headers().get_one("x-mesa-key").map(str::to_string),
        ))
    }
}

// Helper function to resolve a session key to its mesa
async fn authenticate_mesa(
    key: &MesaKey,
    db: &mut Connection<ElectionsDb>,
) -> Result<i32, ApiError> {
    let key = key.0.as_deref().ok_or(ApiError::MesaNotAuthenticated)?;

    mesa_keys::table
        .find(key)
        .select(mesa_keys::mesa_id)
        .first::<i32>(db)
        .await
        .optional()?
        .ok_or(ApiError::MesaNotAuthenticated)
}

// Mesa login: the operator exchanges the station code for a session key.
// Keys never expire; one mesa may hold several.
#[post("/mesa/login", format = "json", data = "<request>")]
pub async fn mesa_login(
    mut db: Connection<ElectionsDb>,
    request: Json<MesaLoginRequest>,
) -> Result<Json<MesaLoginResponse>, ApiError> {
    let code = request
        .mesa_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or(ApiError::MissingField)?;

    let mesa_id = mesas::table
        .filter(mesas::code.eq(code))
        .select(mesas::id)
        .first::<i32>(&mut db)
        .await
        .optional()?
        .ok_or(ApiError::InvalidMesaCode)?;

    let mesa_key = Uuid::new_v4().to_string();

    diesel::insert_into(mesa_keys::table)
        .values(NewMesaKey {
            key: mesa_key.clone(),
            mesa_id,
        })
        .execute(&mut db)
        .await?;

    Ok(Json(MesaLoginResponse { ok: true, mesa_key }))
}

// Verify identity (dni + otp) and return the races the voter may cast
#[post("/voter/verify", format = "json", data = "<request>")]
pub async fn voter_verify(
    mut db: Connection<ElectionsDb>,
    key: MesaKey,
    request: Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    authenticate_mesa(&key, &mut db).await?;

    let voter = voters::table
        .find(&request.dni)
        .first::<Voter>(&mut db)
        .await
        .optional()?
        .ok_or(ApiError::VoterNotFound)?;

    if voter.is_blocked {
        return Err(ApiError::VoterBlocked);
    }
    if voter.otp != request.otp {
        return Err(ApiError::InvalidPin);
    }

    let rep = race_card(&mut db, Race::Rep, Some(voter.course.as_str())).await?;
    let amb = race_card(&mut db, Race::Amb, Some(voter.course.as_str())).await?;
    let per = race_card(&mut db, Race::Per, None).await?;
    let races = RaceBoard { rep, amb, per };

    Ok(Json(VerifyResponse {
        ok: true,
        voter: voter.into(),
        races,
    }))
}

// rep and amb are scoped to the voter's course, per is school-wide
async fn race_card(
    db: &mut Connection<ElectionsDb>,
    race: Race,
    course: Option<&str>,
) -> Result<RaceCard, ApiError> {
    let mut query = candidates::table
        .filter(candidates::race.eq(race.as_str()))
        .select(CandidateOption::as_select())
        .into_boxed();

    if let Some(course) = course {
        query = query.filter(candidates::course.eq(course));
    }

    Ok(RaceCard {
        title: race.title(course.unwrap_or("")),
        candidates: query.load::<CandidateOption>(db).await?,
    })
}

// Record an anonymous ballot per selected race and mark the voter as having
// voted. The whole event is one transaction: the conditional flag updates
// make a concurrent duplicate cast lose and roll back entirely.
#[post("/vote/cast", format = "json", data = "<request>")]
pub async fn cast_vote(
    mut db: Connection<ElectionsDb>,
    key: MesaKey,
    config: &State<AppConfig>,
    request: Json<CastRequest>,
) -> Result<Json<CastResponse>, ApiError> {
    let mesa_id = authenticate_mesa(&key, &mut db).await?;
    let request = request.into_inner();
    let audit_key = config.audit_key.clone();

    let receipt = db
        .transaction::<String, ApiError, _>(move |conn| {
            async move {
                let voter = voters::table
                    .find(&request.dni)
                    .first::<Voter>(conn)
                    .await
                    .optional()?
                    .ok_or(ApiError::VoterNotFound)?;

                if voter.otp != request.otp {
                    return Err(ApiError::InvalidPin);
                }

                for race in Race::ALL {
                    if request.selection(race).is_some() && voter.has_voted(race) {
                        return Err(ApiError::AlreadyVoted(race));
                    }
                }

                let ballot_id = Uuid::new_v4().to_string();
                let now = Utc::now().naive_utc();
                let now_text = now.format("%Y-%m-%d %H:%M:%S").to_string();
                let mut cast = Vec::new();

                for race in Race::ALL {
                    let Some(candidate) = request.selection(race) else {
                        continue;
                    };

                    // Re-check under the transaction: only the request that
                    // flips the flag keeps its ballot.
                    if !claim_race(conn, &request.dni, race).await? {
                        return Err(ApiError::AlreadyVoted(race));
                    }

                    diesel::insert_into(ballots::table)
                        .values(NewBallot {
                            ballot_id: ballot_id.clone(),
                            mesa_id,
                            race: race.as_str().to_string(),
                            candidate_id: candidate.to_string(),
                            created_at: now,
                            audit_hash: audit::ballot_tag(
                                &audit_key,
                                &request.dni,
                                race.as_str(),
                                &now_text,
                            ),
                        })
                        .execute(conn)
                        .await?;

                    cast.push(race);
                }

                // Rotate the PIN so it cannot be replayed, races cast or not
                diesel::update(voters::table.filter(voters::dni.eq(&request.dni)))
                    .set(voters::otp.eq(audit::generate_otp()))
                    .execute(conn)
                    .await?;

                diesel::insert_into(ledger::table)
                    .values(NewLedgerEntry {
                        ballot_id: ballot_id.clone(),
                        mesa_id,
                        timestamp: now,
                        races: join_races(&cast),
                        audit_hash: audit::ledger_tag(&audit_key, &ballot_id, mesa_id),
                    })
                    .execute(conn)
                    .await?;

                Ok(ballot_id)
            }
            .scope_boxed()
        })
        .await?;

    Ok(Json(CastResponse { ok: true, receipt }))
}

// Flip one has-voted flag, but only if it is still clear. A zero row count
// means another request won the race for this voter.
async fn claim_race(
    conn: &mut Connection<ElectionsDb>,
    dni: &str,
    race: Race,
) -> Result<bool, diesel::result::Error> {
    let updated = match race {
        Race::Rep => {
            diesel::update(
                voters::table
                    .filter(voters::dni.eq(dni))
                    .filter(voters::has_voted_rep.eq(false)),
            )
            .set(voters::has_voted_rep.eq(true))
            .execute(conn)
            .await?
        }
        Race::Amb => {
            diesel::update(
                voters::table
                    .filter(voters::dni.eq(dni))
                    .filter(voters::has_voted_amb.eq(false)),
            )
            .set(voters::has_voted_amb.eq(true))
            .execute(conn)
            .await?
        }
        Race::Per => {
            diesel::update(
                voters::table
                    .filter(voters::dni.eq(dni))
                    .filter(voters::has_voted_per.eq(false)),
            )
            .set(voters::has_voted_per.eq(true))
            .execute(conn)
            .await?
        }
    };

    Ok(updated > 0)
}

// Ledger visible to the mesa team: the 100 most recent casting events
#[get("/mesa/ledger")]
pub async fn mesa_ledger(
    mut db: Connection<ElectionsDb>,
    key: MesaKey,
) -> Result<Json<LedgerResponse>, ApiError> {
    let mesa_id = authenticate_mesa(&key, &mut db).await?;

    let rows = ledger::table
        .filter(ledger::mesa_id.eq(mesa_id))
        .order(ledger::timestamp.desc())
        .limit(100)
        .select(LedgerRow::as_select())
        .load::<LedgerRow>(&mut db)
        .await?;

    let items = rows
        .into_iter()
        .map(|row| LedgerItem {
            ballot_id: row.ballot_id,
            timestamp: row.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            races: split_races(&row.races),
            audit_hash: row.audit_hash,
        })
        .collect();

    Ok(Json(LedgerResponse { ok: true, items }))
}
