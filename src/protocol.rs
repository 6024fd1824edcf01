//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Card, CardLanguage, PairSource};
use crate::game::{GameRound, Phase, SelectOutcome};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    NewRound {
        prompt: String,
    },
    SelectCard {
        #[serde(rename = "roundId")]
        round_id: String,
        #[serde(rename = "cardId")]
        card_id: i64,
    },
    GetRound {
        #[serde(rename = "roundId")]
        round_id: String,
    },
    ResetRound {
        #[serde(rename = "roundId")]
        round_id: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Round {
        round: RoundOut,
    },
    SelectResult {
        outcome: SelectOutcome,
        round: RoundOut,
    },
    ResetDone {
        round: RoundOut,
    },
    Error {
        message: String,
    },
}

/// One card as shown to the client.
#[derive(Debug, Serialize)]
pub struct CardOut {
    #[serde(rename = "cardId")]
    pub card_id: i64,
    #[serde(rename = "pairId")]
    pub pair_id: i64,
    pub text: String,
    pub language: CardLanguage,
    pub matched: bool,
}

/// Round snapshot DTO used by both WS and HTTP.
#[derive(Debug, Serialize)]
pub struct RoundOut {
    pub id: String,
    pub phase: Phase,
    pub source: Option<PairSource>,
    pub cards: Vec<CardOut>,
    pub selection: Vec<i64>,
    #[serde(rename = "showError")]
    pub show_error: bool,
    pub completed: bool,
}

fn card_to_out(c: &Card) -> CardOut {
    CardOut {
        card_id: c.card_id,
        pair_id: c.pair_id,
        text: c.text.clone(),
        language: c.language,
        matched: c.matched,
    }
}

/// Convert an internal round to the public snapshot.
pub fn to_out(id: &str, round: &GameRound) -> RoundOut {
    RoundOut {
        id: id.to_string(),
        phase: round.phase(),
        source: round.source(),
        cards: round.cards().iter().map(card_to_out).collect(),
        selection: round.selection().to_vec(),
        show_error: round.show_error(),
        completed: round.completed(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct PairsIn {
    pub prompt: String,
}

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct NewRoundIn {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectIn {
    #[serde(rename = "cardId")]
    pub card_id: i64,
}

#[derive(Serialize)]
pub struct SelectOut {
    pub outcome: SelectOutcome,
    pub round: RoundOut,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
