//! Inbound platform events and their dispatch.
//!
//! Platform adapters translate whatever their transport delivers into an
//! [`InboundEvent`] and hand it to a [`Dispatcher`]. Each variant has exactly
//! one handler; the [`DispatchOutcome`] tells the adapter what to render.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::BotConfig;
use crate::error::{Error, Result};
use crate::feedback::{Feedback, FeedbackAggregator, Polarity};
use crate::lifecycle::{Delivery, IngestOutcome, TicketLifecycle};
use crate::stats::DashboardStats;
use crate::ticket::{BotResponse, Ticket};
use crate::types::ResponseId;

const APPROVE_PREFIX: &str = "approve_";
const REJECT_PREFIX: &str = "reject_";

/// A chat message observed in some channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: String,
    #[serde(default)]
    pub channel_name: String,
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    /// Set for the bot itself and any other automated account.
    #[serde(default)]
    pub is_bot: bool,
    pub content: String,
}

/// A reaction added to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub message_id: String,
    pub user_id: String,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub emoji: String,
    /// Takes precedence over `emoji` when the adapter already resolved it.
    #[serde(default)]
    pub polarity: Option<Polarity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Pause,
    Resume,
    Stats,
    Config,
}

/// A slash command invoked in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEvent {
    pub command: Command,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub user_id: String,
    /// The platform's permission verdict for the invoking user.
    #[serde(default)]
    pub is_admin: bool,
}

/// A button press on an approval prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    /// `approve_<response id>` or `reject_<response id>`.
    pub custom_id: String,
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    Message(InboundMessage),
    Reaction(ReactionEvent),
    Command(CommandEvent),
    Button(ButtonEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Ingested { result: IngestOutcome },
    /// The response waits for an operator; `buttons` are the custom ids the
    /// adapter attaches to its approval prompt.
    AwaitingApproval {
        ticket: Ticket,
        response: BotResponse,
        buttons: [String; 2],
    },
    FeedbackRecorded { feedback: Feedback },
    Reply { text: String },
    Approved { delivery: Delivery },
    Rejected { response: BotResponse },
    Ignored { reason: String },
}

impl DispatchOutcome {
    fn ignored(reason: &str) -> Self {
        Self::Ignored {
            reason: reason.to_string(),
        }
    }
}

pub struct Dispatcher {
    lifecycle: Arc<TicketLifecycle>,
    feedback: FeedbackAggregator,
}

impl Dispatcher {
    pub fn new(lifecycle: Arc<TicketLifecycle>) -> Self {
        let feedback = FeedbackAggregator::new(lifecycle.store().clone());
        Self {
            lifecycle,
            feedback,
        }
    }

    pub fn lifecycle(&self) -> &Arc<TicketLifecycle> {
        &self.lifecycle
    }

    #[instrument(skip_all, level = "debug")]
    pub async fn dispatch(&self, event: InboundEvent) -> Result<DispatchOutcome> {
        match event {
            InboundEvent::Message(message) => Ok(match self.lifecycle.ingest(&message).await? {
                IngestOutcome::AwaitingApproval { ticket, response } => {
                    let buttons = approval_buttons(response.id);
                    DispatchOutcome::AwaitingApproval {
                        ticket,
                        response,
                        buttons,
                    }
                }
                result => DispatchOutcome::Ingested { result },
            }),
            InboundEvent::Reaction(reaction) => self.on_reaction(reaction).await,
            InboundEvent::Command(command) => self.on_command(command).await,
            InboundEvent::Button(button) => self.on_button(button).await,
        }
    }

    async fn on_reaction(&self, reaction: ReactionEvent) -> Result<DispatchOutcome> {
        if reaction.is_bot {
            return Ok(DispatchOutcome::ignored("automated reactor"));
        }
        let Some(polarity) = reaction
            .polarity
            .or_else(|| Polarity::from_emoji(&reaction.emoji))
        else {
            debug!(emoji = %reaction.emoji, "reaction is not feedback");
            return Ok(DispatchOutcome::ignored("not a feedback reaction"));
        };

        match self
            .feedback
            .record_reaction(&reaction.message_id, &reaction.user_id, polarity)
            .await?
        {
            Some(feedback) => Ok(DispatchOutcome::FeedbackRecorded { feedback }),
            None => Ok(DispatchOutcome::ignored("untracked message")),
        }
    }

    async fn on_command(&self, event: CommandEvent) -> Result<DispatchOutcome> {
        let text = match event.command {
            Command::Pause if !event.is_admin => {
                "❌ Apenas administradores podem pausar a IA.".to_string()
            }
            Command::Resume if !event.is_admin => {
                "❌ Apenas administradores podem retomar a IA.".to_string()
            }
            Command::Pause => {
                let paused = self
                    .lifecycle
                    .pause(&event.channel_id, &event.guild_id, &event.channel_name)
                    .await?;
                format!(
                    "⏸️ IA Pausada Neste Canal\n\
                     A IA parou de responder em #{}. Um agente humano pode ajudar agora.\n\n\
                     ⚠️ O bot continua respondendo em outros canais e servidores!\n\n\
                     🔄 Para Retomar: Use `/retomar` neste canal",
                    paused.channel_name
                )
            }
            Command::Resume => {
                self.lifecycle.resume(&event.channel_id).await?;
                format!(
                    "▶️ IA Retomada Neste Canal\n\
                     A IA voltou a responder em #{}.\n\n\
                     ⏸️ Para Pausar: Use `/pausar` neste canal",
                    event.channel_name
                )
            }
            Command::Stats => {
                render_stats(&DashboardStats::collect(self.lifecycle.store().as_ref()).await?)
            }
            Command::Config => render_config(&self.lifecycle.store().get_config().await?),
        };
        Ok(DispatchOutcome::Reply { text })
    }

    async fn on_button(&self, button: ButtonEvent) -> Result<DispatchOutcome> {
        let custom_id = button.custom_id.as_str();
        if let Some(id) = custom_id.strip_prefix(APPROVE_PREFIX) {
            let delivery = self.lifecycle.approve(parse_response_id(id)?).await?;
            Ok(DispatchOutcome::Approved { delivery })
        } else if let Some(id) = custom_id.strip_prefix(REJECT_PREFIX) {
            let response = self.lifecycle.reject(parse_response_id(id)?).await?;
            Ok(DispatchOutcome::Rejected { response })
        } else {
            Ok(DispatchOutcome::ignored("unknown button"))
        }
    }
}

fn parse_response_id(raw: &str) -> Result<ResponseId> {
    raw.parse()
        .map_err(|_| Error::Validation(format!("invalid response id: {raw}")))
}

/// Custom ids for the approve/reject buttons of a pending response.
pub fn approval_buttons(id: ResponseId) -> [String; 2] {
    [
        format!("{APPROVE_PREFIX}{id}"),
        format!("{REJECT_PREFIX}{id}"),
    ]
}

pub fn render_stats(stats: &DashboardStats) -> String {
    format!(
        "📊 Estatísticas do Bot\n\
         🎫 Total de Tickets: {}\n\
         💬 Respostas Enviadas: {}\n\
         ⏳ Aguardando Aprovação: {}\n\
         📚 Assuntos Memorizados: {}\n\
         ⭐ Taxa de Satisfação: {}%\n\
         👍 Feedbacks Positivos: {}/{}",
        stats.total_tickets,
        stats.sent_responses,
        stats.pending_responses,
        stats.knowledge_entries,
        stats.satisfaction_rate,
        stats.positive_feedback,
        stats.total_feedback,
    )
}

pub fn render_config(config: &BotConfig) -> String {
    let on_off = |flag: bool, on: &'static str, off: &'static str| if flag { on } else { off };
    let prompt: String = config.system_prompt.chars().take(100).collect();
    format!(
        "⚙️ Configurações do Bot\n\
         🤖 Resposta Automática: {}\n\
         ✋ Requer Aprovação: {}\n\
         ⏱️ Delay de Resposta: {}ms\n\
         📊 Max Tokens: {}\n\
         💬 Prompt do Sistema: {}...\n\
         🔄 Mensagem Fallback: {}",
        on_off(config.auto_respond, "✅ Ativada", "❌ Desativada"),
        on_off(config.require_approval, "✅ Sim", "❌ Não"),
        config.response_delay_ms,
        config.max_tokens,
        prompt,
        config.fallback_message,
    )
}
