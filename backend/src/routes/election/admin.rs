use std::collections::HashMap;

use rocket::serde::json::Json;
use rocket_db_pools::diesel::prelude::*;
use rocket_db_pools::Connection;

use crate::db::ElectionsDb;
use crate::error::ApiError;
use crate::models::{MesaTally, Race, ResultsBody, ResultsRequest, ResultsResponse, TallyRow};
use crate::schema::{admin, ballots, candidates};

// Aggregated results, recomputed from the ballots table on every call
#[post("/admin/results", format = "json", data = "<request>")]
pub async fn results(
    mut db: Connection<ElectionsDb>,
    request: Json<ResultsRequest>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let authorized: i64 = admin::table
        .find(&request.code)
        .count()
        .get_result(&mut db)
        .await?;
    if authorized == 0 {
        return Err(ApiError::InvalidAdminCode);
    }

    let rep = tally_race(&mut db, Race::Rep).await?;
    let amb = tally_race(&mut db, Race::Amb).await?;
    let per = tally_race(&mut db, Race::Per).await?;

    let by_mesa = ballots::table
        .group_by(ballots::mesa_id)
        .select((ballots::mesa_id, diesel::dsl::count_star()))
        .load::<(i32, i64)>(&mut db)
        .await?
        .into_iter()
        .map(|(mesa_id, votos)| MesaTally { mesa_id, votos })
        .collect();

    Ok(Json(ResultsResponse {
        ok: true,
        results: ResultsBody {
            rep,
            amb,
            per,
            by_mesa,
        },
    }))
}

// Grouped ballot counts for one race, most voted first. A ballot whose
// candidate id no longer resolves is reported as "Blanco". A race with no
// ballots yields an empty list.
async fn tally_race(
    db: &mut Connection<ElectionsDb>,
    race: Race,
) -> Result<Vec<TallyRow>, ApiError> {
    let counts = ballots::table
        .filter(ballots::race.eq(race.as_str()))
        .group_by(ballots::candidate_id)
        .select((ballots::candidate_id, diesel::dsl::count_star()))
        .load::<(String, i64)>(db)
        .await?;

    let ids: Vec<&String> = counts.iter().map(|(id, _)| id).collect();
    let names: HashMap<String, String> = candidates::table
        .filter(candidates::id.eq_any(ids))
        .select((candidates::id, candidates::name))
        .load::<(String, String)>(db)
        .await?
        .into_iter()
        .collect();

    let mut rows: Vec<TallyRow> = counts
        .into_iter()
        .map(|(candidate_id, count)| TallyRow {
            name: names
                .get(&candidate_id)
                .cloned()
                .unwrap_or_else(|| "Blanco".to_string()),
            count,
        })
        .collect();

    rows.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(rows)
}
