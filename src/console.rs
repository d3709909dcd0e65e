//! Line-delimited JSON command surface.
//!
//! One command object per input line, one reply object per output line:
//! ```text
//! > {"command":"pauseShift","actorId":"m1"}
//! < {"ok":true,"data":{"applied":true,...}}
//! ```

use anyhow::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{self, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{
    ledger::commands as ledger,
    models::SettingsUpdate,
    pricing::ServiceDraft,
    reports::{RevenueScope, TimeWindow},
    timer::commands as timer,
    workshop_commands as workshop,
    AppState,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    StartShift {
        actor_id: String,
    },
    PauseShift {
        actor_id: String,
    },
    ResumeShift {
        actor_id: String,
    },
    EndShift {
        actor_id: String,
    },
    RemoteStart {
        actor_id: String,
        mechanic_id: String,
    },
    RemotePause {
        actor_id: String,
        mechanic_id: String,
    },
    RemoteResume {
        actor_id: String,
        mechanic_id: String,
    },
    RemoteStop {
        actor_id: String,
        mechanic_id: String,
    },
    ForceFinalize {
        actor_id: String,
        mechanic_id: String,
        #[serde(default)]
        confirmed: bool,
    },
    DeleteSessions {
        actor_id: String,
        session_ids: Vec<String>,
        #[serde(default)]
        confirmed: bool,
    },
    RecordService {
        actor_id: String,
        draft: ServiceDraft,
    },
    Settle {
        actor_id: String,
        mechanic_id: String,
        #[serde(default)]
        confirmed: bool,
    },
    UpdateSettings {
        actor_id: String,
        update: SettingsUpdate,
    },
    TimeRollup {
        actor_id: String,
        window: TimeWindow,
        #[serde(default)]
        mechanic_id: Option<String>,
    },
    Revenue {
        actor_id: String,
        #[serde(default)]
        scope: Option<RevenueScope>,
        /// One row per mechanic instead of a single summary.
        #[serde(default)]
        by_mechanic: bool,
    },
    Settlements {
        actor_id: String,
    },
    /// Pending tax and settle eligibility per staff member.
    Balances {
        actor_id: String,
    },
    LiveBoard {
        actor_id: String,
    },
    Workshop,
    SyncStatus,
    SetVisible {
        visible: bool,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Reply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    fn from_result(result: Result<Value, String>) -> Self {
        match result {
            Ok(data) => Self {
                ok: true,
                data: Some(data),
                error: None,
            },
            Err(error) => Self {
                ok: false,
                data: None,
                error: Some(error),
            },
        }
    }
}

fn json<T: Serialize>(result: Result<T, String>) -> Result<Value, String> {
    result.and_then(|value| serde_json::to_value(value).map_err(|e| e.to_string()))
}

pub fn execute(state: &AppState, command: Command) -> Result<Value, String> {
    match command {
        Command::StartShift { actor_id } => json(timer::start_shift(state, &actor_id)),
        Command::PauseShift { actor_id } => json(timer::pause_shift(state, &actor_id)),
        Command::ResumeShift { actor_id } => json(timer::resume_shift(state, &actor_id)),
        Command::EndShift { actor_id } => json(timer::end_shift(state, &actor_id)),
        Command::RemoteStart {
            actor_id,
            mechanic_id,
        } => json(timer::remote_start(state, &actor_id, &mechanic_id)),
        Command::RemotePause {
            actor_id,
            mechanic_id,
        } => json(timer::remote_pause(state, &actor_id, &mechanic_id)),
        Command::RemoteResume {
            actor_id,
            mechanic_id,
        } => json(timer::remote_resume(state, &actor_id, &mechanic_id)),
        Command::RemoteStop {
            actor_id,
            mechanic_id,
        } => json(timer::remote_stop(state, &actor_id, &mechanic_id)),
        Command::ForceFinalize {
            actor_id,
            mechanic_id,
            confirmed,
        } => json(timer::force_finalize(state, &actor_id, &mechanic_id, confirmed)),
        Command::DeleteSessions {
            actor_id,
            session_ids,
            confirmed,
        } => json(timer::delete_sessions(state, &actor_id, session_ids, confirmed)),
        Command::RecordService { actor_id, draft } => {
            json(ledger::record_service(state, &actor_id, draft))
        }
        Command::Settle {
            actor_id,
            mechanic_id,
            confirmed,
        } => json(ledger::settle(state, &actor_id, &mechanic_id, confirmed)),
        Command::UpdateSettings { actor_id, update } => {
            json(workshop::update_settings(state, &actor_id, update))
        }
        Command::TimeRollup {
            actor_id,
            window,
            mechanic_id,
        } => json(timer::time_rollup(state, &actor_id, window, mechanic_id)),
        Command::Revenue {
            actor_id,
            by_mechanic: true,
            ..
        } => json(ledger::revenue_by_mechanic(state, &actor_id)),
        Command::Revenue {
            actor_id, scope, ..
        } => json(ledger::revenue(
            state,
            &actor_id,
            scope.unwrap_or(RevenueScope::Workshop),
        )),
        Command::Settlements { actor_id } => json(ledger::settlements(state, &actor_id)),
        Command::Balances { actor_id } => json(ledger::balances(state, &actor_id)),
        Command::LiveBoard { actor_id } => json(timer::live_board(state, &actor_id)),
        Command::Workshop => json(Ok(workshop::get_workshop(state))),
        Command::SyncStatus => json(Ok(workshop::sync_status(state))),
        Command::SetVisible { visible } => json(Ok(workshop::set_visible(state, visible))),
    }
}

pub fn handle_line(state: &AppState, line: &str) -> Reply {
    let result = serde_json::from_str::<Command>(line)
        .map_err(|err| format!("invalid command: {err}"))
        .and_then(|command| {
            debug!("console command: {command:?}");
            execute(state, command)
        });
    Reply::from_result(result)
}

/// Serves commands from `input` until it reaches end of file.
pub async fn serve<R, W>(state: &AppState, input: R, mut output: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = handle_line(state, line);
        let mut encoded = serde_json::to_vec(&reply)?;
        encoded.push(b'\n');
        output.write_all(&encoded).await?;
        output.flush().await?;
    }
    info!("Console input closed");
    Ok(())
}

pub async fn serve_stdio(state: &AppState) -> Result<()> {
    serve(state, io::stdin(), io::stdout()).await
}
