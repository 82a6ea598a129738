use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{ballots, candidates, ledger, mesa_keys, mesas, voters};

/// One of the three independent elections a voter may participate in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Race {
    Rep,
    Amb,
    Per,
}

impl Race {
    /// Casting order is fixed: representative, environmental leader, officer.
    pub const ALL: [Race; 3] = [Race::Rep, Race::Amb, Race::Per];

    /// Short code stored in the `race` columns and used in the API body.
    pub fn as_str(self) -> &'static str {
        match self {
            Race::Rep => "rep",
            Race::Amb => "amb",
            Race::Per => "per",
        }
    }

    /// Ballot title shown to the voter. `rep` and `amb` are course-scoped,
    /// `per` is school-wide.
    pub fn title(self, course: &str) -> String {
        match self {
            Race::Rep => format!("Representante ({course})"),
            Race::Amb => format!("Líder Ambiental ({course})"),
            Race::Per => "Personería (Colegio)".to_string(),
        }
    }
}

impl std::fmt::Display for Race {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Race::Rep => "representante",
            Race::Amb => "líder ambiental",
            Race::Per => "personería",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = voters)]
pub struct Voter {
    pub dni: String,
    pub name: String,
    pub course: String,
    pub otp: String,
    pub is_blocked: bool,
    pub has_voted_rep: bool,
    pub has_voted_amb: bool,
    pub has_voted_per: bool,
}

impl Voter {
    pub fn has_voted(&self, race: Race) -> bool {
        match race {
            Race::Rep => self.has_voted_rep,
            Race::Amb => self.has_voted_amb,
            Race::Per => self.has_voted_per,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = voters)]
pub struct NewVoter {
    pub dni: String,
    pub name: String,
    pub course: String,
    pub otp: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = mesas)]
pub struct NewMesa {
    pub name: String,
    pub code: String,
    pub code_hash: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = mesa_keys)]
pub struct NewMesaKey {
    pub key: String,
    pub mesa_id: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = candidates)]
pub struct NewCandidate {
    pub id: String,
    pub race: String,
    pub name: String,
    pub detail: String,
    pub course: Option<String>,
}

/// Candidate fields exposed to the voter during verification.
#[derive(Debug, Clone, Serialize, Queryable, Selectable)]
#[diesel(table_name = candidates)]
pub struct CandidateOption {
    pub id: String,
    pub name: String,
    pub detail: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = ballots)]
pub struct NewBallot {
    pub ballot_id: String,
    pub mesa_id: i32,
    pub race: String,
    pub candidate_id: String,
    pub created_at: NaiveDateTime,
    pub audit_hash: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = ledger)]
pub struct NewLedgerEntry {
    pub ballot_id: String,
    pub mesa_id: i32,
    pub timestamp: NaiveDateTime,
    pub races: String,
    pub audit_hash: String,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = ledger)]
pub struct LedgerRow {
    pub ballot_id: String,
    pub timestamp: NaiveDateTime,
    pub races: String,
    pub audit_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct MesaLoginRequest {
    pub mesa_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MesaLoginResponse {
    pub ok: bool,
    pub mesa_key: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub dni: String,
    pub otp: String,
}

/// Voter fields echoed back after verification. The stored OTP is never
/// returned.
#[derive(Debug, Serialize)]
pub struct VoterInfo {
    pub dni: String,
    pub name: String,
    pub course: String,
    pub has_voted_rep: bool,
    pub has_voted_amb: bool,
    pub has_voted_per: bool,
}

impl From<Voter> for VoterInfo {
    fn from(voter: Voter) -> Self {
        VoterInfo {
            dni: voter.dni,
            name: voter.name,
            course: voter.course,
            has_voted_rep: voter.has_voted_rep,
            has_voted_amb: voter.has_voted_amb,
            has_voted_per: voter.has_voted_per,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RaceCard {
    pub title: String,
    pub candidates: Vec<CandidateOption>,
}

#[derive(Debug, Serialize)]
pub struct RaceBoard {
    pub rep: RaceCard,
    pub amb: RaceCard,
    pub per: RaceCard,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub ok: bool,
    pub voter: VoterInfo,
    pub races: RaceBoard,
}

#[derive(Debug, Deserialize)]
pub struct CastRequest {
    pub dni: String,
    pub otp: String,
    pub rep: Option<String>,
    pub amb: Option<String>,
    pub per: Option<String>,
}

impl CastRequest {
    /// Selected candidate for a race; an empty or whitespace-only value
    /// counts as no selection.
    pub fn selection(&self, race: Race) -> Option<&str> {
        let raw = match race {
            Race::Rep => &self.rep,
            Race::Amb => &self.amb,
            Race::Per => &self.per,
        };
        raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct CastResponse {
    pub ok: bool,
    pub receipt: String,
}

#[derive(Debug, Serialize)]
pub struct LedgerItem {
    pub ballot_id: String,
    pub timestamp: String,
    pub races: Vec<String>,
    pub audit_hash: String,
}

#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub ok: bool,
    pub items: Vec<LedgerItem>,
}

#[derive(Debug, Deserialize)]
pub struct ResultsRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct TallyRow {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MesaTally {
    pub mesa_id: i32,
    pub votos: i64,
}

#[derive(Debug, Serialize)]
pub struct ResultsBody {
    pub rep: Vec<TallyRow>,
    pub amb: Vec<TallyRow>,
    pub per: Vec<TallyRow>,
    #[serde(rename = "byMesa")]
    pub by_mesa: Vec<MesaTally>,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub ok: bool,
    pub results: ResultsBody,
}

/// Candidate ids are derived, not assigned: `{race}-{course|ALL}-{name}`
/// with runs of whitespace collapsed to underscores.
pub fn candidate_id(race: &str, course: Option<&str>, name: &str) -> String {
    format!("{}-{}-{}", race, course.unwrap_or("ALL"), name)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Comma-joined race list stored on a ledger row.
pub fn join_races(races: &[Race]) -> String {
    races
        .iter()
        .map(|race| race.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Inverse of [`join_races`]; an empty field yields an empty list.
pub fn split_races(field: &str) -> Vec<String> {
    field
        .split(',')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_id_collapses_whitespace() {
        assert_eq!(
            candidate_id("rep", Some("T3A"), "Camila Pardo"),
            "rep-T3A-Camila_Pardo"
        );
    }

    #[test]
    fn candidate_id_school_wide_uses_all() {
        assert_eq!(
            candidate_id("per", None, "Personería Lista A"),
            "per-ALL-Personería_Lista_A"
        );
    }

    #[test]
    fn races_round_trip() {
        let joined = join_races(&[Race::Rep, Race::Per]);
        assert_eq!(joined, "rep,per");
        assert_eq!(split_races(&joined), vec!["rep", "per"]);
    }

    #[test]
    fn empty_races_field_is_empty_list() {
        assert_eq!(join_races(&[]), "");
        assert!(split_races("").is_empty());
    }

    #[test]
    fn race_titles_are_course_scoped() {
        assert_eq!(Race::Rep.title("T3A"), "Representante (T3A)");
        assert_eq!(Race::Amb.title("T4B"), "Líder Ambiental (T4B)");
        assert_eq!(Race::Per.title("T3A"), "Personería (Colegio)");
    }

    #[test]
    fn empty_selection_counts_as_absent() {
        let request = CastRequest {
            dni: "1001".into(),
            otp: "123456".into(),
            rep: Some("rep-T3A-Camila_Pardo".into()),
            amb: Some("  ".into()),
            per: None,
        };
        assert_eq!(request.selection(Race::Rep), Some("rep-T3A-Camila_Pardo"));
        assert_eq!(request.selection(Race::Amb), None);
        assert_eq!(request.selection(Race::Per), None);
    }

    #[test]
    fn login_response_envelope_shape() {
        let body = serde_json::to_value(MesaLoginResponse {
            ok: true,
            mesa_key: "abc".into(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"ok": true, "mesa_key": "abc"}));
    }

    #[test]
    fn results_body_uses_by_mesa_key() {
        let body = serde_json::to_value(ResultsBody {
            rep: vec![],
            amb: vec![],
            per: vec![],
            by_mesa: vec![MesaTally { mesa_id: 1, votos: 3 }],
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "rep": [], "amb": [], "per": [],
                "byMesa": [{"mesa_id": 1, "votos": 3}]
            })
        );
    }
}
