//! 扫码解析
//!
//! 依次检查：存在性 → 过期 → 生效窗口 → 密码 → 实验分流 → 内容分发。
//! 第一个失败的门禁即为终态；只有产生了目标的路径才记录扫码。

pub mod content;
pub mod outcome;
pub mod unlock;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, trace};

use crate::errors::{QrlinkerError, Result};
use crate::experiment;
use crate::storage::{Assignment, Code, NewScan, ResolverStore, ScanContext, Variant};

pub use content::{Dispatch, dispatch};
pub use outcome::Outcome;
pub use unlock::UnlockService;

/// 一次扫码的输入
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub token: String,
    pub visitor_hash: String,
    /// `qr_unlock_{token}` cookie 的值
    pub unlock_token: Option<String>,
    pub context: ScanContext,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: Outcome,
    /// 命中实验时分配到的 variant
    pub variant_id: Option<String>,
}

/// 解锁尝试的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockAttempt {
    /// 密码正确，附带签发的凭证
    Unlocked(String),
    /// code 不存在或未设置密码
    NotProtected,
    Rejected,
}

impl Resolution {
    fn terminal(outcome: Outcome) -> Self {
        Self {
            outcome,
            variant_id: None,
        }
    }
}

pub struct RedirectResolver {
    store: Arc<dyn ResolverStore>,
    unlock: Arc<UnlockService>,
}

impl RedirectResolver {
    pub fn new(store: Arc<dyn ResolverStore>, unlock: Arc<UnlockService>) -> Self {
        Self { store, unlock }
    }

    pub fn unlock_service(&self) -> &UnlockService {
        &self.unlock
    }

    pub async fn resolve(&self, req: &ScanRequest) -> Result<Resolution> {
        self.resolve_at(req, Utc::now()).await
    }

    /// 以给定时间解析
    pub async fn resolve_at(&self, req: &ScanRequest, now: DateTime<Utc>) -> Result<Resolution> {
        let code = match self.store.find_code_by_token(&req.token).await? {
            Some(code) if !code.archived => code,
            _ => {
                trace!("Code not found: {}", req.token);
                return Ok(Resolution::terminal(Outcome::NotFound));
            }
        };

        let (outcome, variant) = match self.check_gates(&code, req, now) {
            Some(outcome) => {
                debug!("Code {} stopped at gate: {:?}", code.token, outcome);
                (outcome, None)
            }
            None => self.route(&code, &req.visitor_hash, now).await?,
        };

        // 只有产生目标的扫码才计数
        if !outcome.is_destination() {
            return Ok(Resolution::terminal(outcome));
        }

        let variant_id = variant.map(|v| v.id);
        self.store
            .record_scan(&NewScan {
                code_id: code.id.clone(),
                scanned_at: now,
                context: req.context.clone(),
                variant_id: variant_id.clone(),
                visitor_hash: Some(req.visitor_hash.clone()),
            })
            .await?;

        Ok(Resolution {
            outcome,
            variant_id,
        })
    }

    /// 门禁通过后的目标：实验 variant 优先，否则按内容分发
    async fn route(
        &self,
        code: &Code,
        visitor_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(Outcome, Option<Variant>)> {
        if let Some(v) = self.pick_variant(code, visitor_hash, now).await? {
            let outcome = Outcome::Redirect {
                location: v.destination_url.clone(),
            };
            return Ok((outcome, Some(v)));
        }

        match self.dispatch_content(code) {
            Ok(outcome) => Ok((outcome, None)),
            Err(e) => {
                error!(
                    code = %code.token,
                    owner = %code.owner_id,
                    "{}",
                    e.format_simple()
                );
                Ok((Outcome::NotFound, None))
            }
        }
    }

    /// 校验密码并签发解锁凭证
    pub async fn unlock(&self, token: &str, password: &str) -> Result<UnlockAttempt> {
        let code = match self.store.find_code_by_token(token).await? {
            Some(code) if !code.archived => code,
            _ => return Ok(UnlockAttempt::NotProtected),
        };
        let Some(hash) = code.password_hash.as_deref() else {
            return Ok(UnlockAttempt::NotProtected);
        };

        match crate::utils::password::verify_password(password, hash) {
            Ok(true) => Ok(UnlockAttempt::Unlocked(self.unlock.issue(&code)?)),
            Ok(false) => {
                debug!("Wrong password for code {}", code.token);
                Ok(UnlockAttempt::Rejected)
            }
            Err(e) => {
                error!(code = %code.token, "{}", e.format_simple());
                Ok(UnlockAttempt::Rejected)
            }
        }
    }

    fn check_gates(&self, code: &Code, req: &ScanRequest, now: DateTime<Utc>) -> Option<Outcome> {
        if code.expires_at.is_some_and(|t| t <= now) {
            return Some(Outcome::Expired);
        }
        if code.active_from.is_some_and(|t| t > now) {
            return Some(Outcome::NotYetActive);
        }
        if code.active_until.is_some_and(|t| t <= now) {
            return Some(Outcome::NotActive);
        }
        if code.password_hash.is_some() {
            let unlocked = req
                .unlock_token
                .as_deref()
                .is_some_and(|t| self.unlock.verify(code, t));
            if !unlocked {
                return Some(Outcome::PasswordRequired {
                    token: code.token.clone(),
                });
            }
        }
        None
    }

    /// 运行中的实验分流，返回选中的 variant
    async fn pick_variant(
        &self,
        code: &Code,
        visitor_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Variant>> {
        let Some(running) = self.store.find_running_experiment(&code.id).await? else {
            return Ok(None);
        };
        let experiment_id = &running.experiment.id;

        let prior = self.store.find_assignment(experiment_id, visitor_hash).await?;

        let selection =
            match experiment::select(experiment_id, visitor_hash, &running.variants, prior.as_ref()) {
                Ok(selection) => selection,
                Err(e @ QrlinkerError::NoVariantsConfigured(_)) => {
                    // 退化为 code 自身的目标
                    error!(
                        code = %code.token,
                        owner = %code.owner_id,
                        "{}",
                        e.format_simple()
                    );
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };

        if !selection.sticky {
            let stale = prior.as_ref().map(|p| p.variant_id.as_str());
            if let Some(stale) = stale {
                debug!(
                    "Reassigning visitor {} from deleted variant {} to {}",
                    visitor_hash, stale, selection.variant.id
                );
            }
            self.store
                .save_assignment(
                    &Assignment {
                        experiment_id: experiment_id.clone(),
                        visitor_hash: visitor_hash.to_string(),
                        variant_id: selection.variant.id.clone(),
                        assigned_at: now,
                    },
                    stale,
                )
                .await?;
        }

        Ok(Some(selection.variant.clone()))
    }

    fn dispatch_content(&self, code: &Code) -> Result<Outcome> {
        let payload = code.payload()?;
        let outcome = match dispatch(&payload, code.destination_url.as_deref(), code.landing_page)? {
            Dispatch::Redirect(location) => Outcome::Redirect { location },
            Dispatch::Landing => Outcome::Landing {
                token: code.token.clone(),
                content_type: payload.content_type().to_string(),
            },
        };
        Ok(outcome)
    }
}
