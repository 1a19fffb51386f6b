use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use uuid::Uuid;

use super::status::ActiveStatus;
use super::types::{Agent, AgentView, CreateAgentRequest, UpdateAgentRequest};
use crate::core::shared::error::{ApiError, ApiJson, ApiPath};
use crate::core::shared::schema::{agents, profiles, users};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::institution::access::{require_member, require_owner};
use crate::security::auth::AuthenticatedUser;

pub(crate) fn load_agent(conn: &mut PgConnection, uuid: Uuid) -> Result<Agent, ApiError> {
    agents::table
        .find(uuid)
        .select(Agent::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Agent not found.".into()))
}

/// The user behind an agent's profile.
pub(crate) fn agent_user_id(conn: &mut PgConnection, agent: &Agent) -> Result<i32, ApiError> {
    profiles::table
        .find(agent.profile_id)
        .select(profiles::user_id)
        .first(conn)
        .map_err(ApiError::from)
}

/// Agents the user acts as within the institution.
pub(crate) fn agents_of_user(
    conn: &mut PgConnection,
    user_id: i32,
    institution_id: i32,
) -> Result<Vec<Uuid>, ApiError> {
    agents::table
        .inner_join(profiles::table)
        .filter(profiles::user_id.eq(user_id))
        .filter(agents::institution_id.eq(institution_id))
        .select(agents::uuid)
        .load(conn)
        .map_err(ApiError::from)
}

fn agent_views(
    conn: &mut PgConnection,
    institution_id: Option<i32>,
    uuid: Option<Uuid>,
) -> Result<Vec<AgentView>, ApiError> {
    let mut query = agents::table
        .inner_join(profiles::table.inner_join(users::table))
        .select((Agent::as_select(), users::id, users::fullname, users::email))
        .order(agents::created_at.desc())
        .into_boxed();
    if let Some(institution_id) = institution_id {
        query = query.filter(agents::institution_id.eq(institution_id));
    }
    if let Some(uuid) = uuid {
        query = query.filter(agents::uuid.eq(uuid));
    }

    let rows: Vec<(Agent, i32, String, String)> = query.load(conn)?;
    Ok(rows
        .into_iter()
        .map(|(agent, user, fullname, email)| AgentView {
            agent,
            user,
            fullname,
            email,
        })
        .collect())
}

fn agent_view(conn: &mut PgConnection, uuid: Uuid) -> Result<AgentView, ApiError> {
    agent_views(conn, None, Some(uuid))?
        .pop()
        .ok_or_else(|| ApiError::NotFound("Agent not found.".into()))
}

pub async fn list_agents(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
) -> Result<Json<Vec<AgentView>>, ApiError> {
    let views = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;
        agent_views(conn, Some(institution_id), None)
    })
    .await?;
    Ok(Json(views))
}

pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
    ApiJson(req): ApiJson<CreateAgentRequest>,
) -> Result<(StatusCode, Json<AgentView>), ApiError> {
    let view = with_conn(&state.conn, move |conn| {
        require_owner(conn, &auth, institution_id)?;

        let profile_institution: Option<Option<i32>> = profiles::table
            .find(req.profile)
            .select(profiles::institution_id)
            .first(conn)
            .optional()?;
        match profile_institution {
            None => return Err(ApiError::field("profile", "Profile not found.")),
            Some(found) if found != Some(institution_id) => {
                return Err(ApiError::Validation(
                    "Agent's Profile must belong to the specified institution.".into(),
                ))
            }
            Some(_) => {}
        }

        let agent = Agent {
            uuid: Uuid::new_v4(),
            profile_id: req.profile,
            institution_id,
            status: req.status.unwrap_or(ActiveStatus::Active).as_str().to_string(),
            created_at: Utc::now(),
        };
        diesel::insert_into(agents::table)
            .values(&agent)
            .execute(conn)?;
        agent_view(conn, agent.uuid)
    })
    .await?;

    info!(
        "Registered profile {} as agent {} of institution {}",
        view.agent.profile_id, view.agent.uuid, view.agent.institution_id
    );
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<Json<AgentView>, ApiError> {
    let view = with_conn(&state.conn, move |conn| {
        let agent = load_agent(conn, uuid)?;
        require_member(conn, &auth, agent.institution_id)?;
        agent_view(conn, uuid)
    })
    .await?;
    Ok(Json(view))
}

pub async fn update_agent(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateAgentRequest>,
) -> Result<Json<AgentView>, ApiError> {
    let view = with_conn(&state.conn, move |conn| {
        let agent = load_agent(conn, uuid)?;
        require_owner(conn, &auth, agent.institution_id)?;
        if let Some(status) = req.status {
            diesel::update(agents::table.find(uuid))
                .set(agents::status.eq(status.as_str()))
                .execute(conn)?;
        }
        agent_view(conn, uuid)
    })
    .await?;

    info!("Updated agent {} ({})", view.agent.uuid, view.agent.status);
    Ok(Json(view))
}

pub async fn delete_agent(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.conn, move |conn| {
        let agent = load_agent(conn, uuid)?;
        require_owner(conn, &auth, agent.institution_id)?;
        diesel::delete(agents::table.find(uuid)).execute(conn)?;
        Ok(())
    })
    .await?;

    info!("Deleted agent {}", uuid);
    Ok(StatusCode::NO_CONTENT)
}
