use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::Method;
use knockout_core::render::TextRenderer;
use knockout_core::{MatchId, Participant, ParticipantId};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::http::{Request, RequestUri, Response, Result};
use crate::store::TournamentId;
use crate::StatusCodeError;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WinnerRequest {
    participant_id: ParticipantId,
}

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    let id: TournamentId = match uri.take() {
        Some(part) => part.parse()?,
        None => return Err(StatusCodeError::not_found().into()),
    };

    match uri.take_str() {
        Some("bracket") if uri.is_empty() => match *req.method() {
            Method::GET => get_bracket(req, id).await,
            Method::POST => create_bracket(req, id).await,
            Method::PUT => redraw(req, id).await,
            _ => Err(StatusCodeError::method_not_allowed().into()),
        },
        Some("rounds") => {
            let round: u32 = match uri.take() {
                Some(part) => part.parse()?,
                None => return Err(StatusCodeError::not_found().into()),
            };

            if !uri.is_empty() {
                return Err(StatusCodeError::not_found().into());
            }

            match *req.method() {
                Method::GET => get_round(req, id, round).await,
                _ => Err(StatusCodeError::method_not_allowed().into()),
            }
        }
        Some("matches") => {
            let match_id: MatchId = match uri.take() {
                Some(part) => part.parse()?,
                None => return Err(StatusCodeError::not_found().into()),
            };

            let action = uri.take_str();
            if !uri.is_empty() {
                return Err(StatusCodeError::not_found().into());
            }

            match (action, req.method().clone()) {
                (None, Method::GET) => get_match(req, id, match_id).await,
                (Some("winner"), Method::POST) => commit_winner(req, id, match_id).await,
                (Some("scores"), Method::PUT) => report_scores(req, id, match_id).await,
                (None | Some("winner") | Some("scores"), _) => {
                    Err(StatusCodeError::method_not_allowed().into())
                }
                (Some(_), _) => Err(StatusCodeError::not_found().into()),
            }
        }
        Some("champion") if uri.is_empty() => match *req.method() {
            Method::GET => get_champion(req, id).await,
            _ => Err(StatusCodeError::method_not_allowed().into()),
        },
        _ => Err(StatusCodeError::not_found().into()),
    }
}

async fn get_bracket(req: Request, id: TournamentId) -> Result {
    let bracket = req.state().engine.get_bracket(id)?;

    match req.query("format") {
        Some("text") => {
            let mut renderer = TextRenderer::new();
            bracket.render(&mut renderer);

            Ok(Response::ok()
                .body(renderer.into_inner())
                .header(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                ))
        }
        Some("json") | None => Ok(Response::ok().json(&bracket)),
        Some(format) => Err(StatusCodeError::bad_request()
            .message(format!("Unknown format: {:?}", format))
            .into()),
    }
}

async fn create_bracket(mut req: Request, id: TournamentId) -> Result {
    let mut participants: Vec<Participant> = req.json().await?;

    if matches!(req.query("shuffle"), Some("true")) {
        participants.shuffle(&mut OsRng);
    }

    let bracket = req.state().engine.build_bracket(id, participants)?;

    Ok(Response::created().json(&bracket))
}

async fn redraw(mut req: Request, id: TournamentId) -> Result {
    let mut participants: Vec<Participant> = req.json().await?;

    if matches!(req.query("shuffle"), Some("true")) {
        participants.shuffle(&mut OsRng);
    }

    let bracket = req.state().engine.redraw(id, participants)?;

    Ok(Response::ok().json(&bracket))
}

async fn get_round(req: Request, id: TournamentId, round: u32) -> Result {
    let matches = req.state().engine.get_round(id, round)?;

    Ok(Response::ok().json(&matches))
}

async fn get_match(req: Request, id: TournamentId, match_id: MatchId) -> Result {
    let r#match = req.state().engine.get_match(id, match_id)?;

    Ok(Response::ok().json(&r#match))
}

async fn commit_winner(mut req: Request, id: TournamentId, match_id: MatchId) -> Result {
    let body: WinnerRequest = req.json().await?;

    let r#match = req
        .state()
        .engine
        .commit_winner(id, match_id, body.participant_id)
        .await?;

    Ok(Response::ok().json(&r#match))
}

async fn report_scores(mut req: Request, id: TournamentId, match_id: MatchId) -> Result {
    let scores: [i64; 2] = req.json().await?;

    let r#match = req.state().engine.report_scores(id, match_id, scores)?;

    Ok(Response::ok().json(&r#match))
}

async fn get_champion(req: Request, id: TournamentId) -> Result {
    match req.state().engine.get_champion(id)? {
        Some(champion) => Ok(Response::ok().json(&champion)),
        None => Ok(Response::no_content()),
    }
}
