//! Dependency cache restore and save
//!
//! Both steps only ever fail with [`NightshiftError::Cache`], which the
//! pipeline records as degraded and moves past.

use crate::cache::{compute_key, format_bytes, CacheLookup};
use crate::config::schema::Config;
use crate::error::{NightshiftError, NightshiftResult};
use crate::pipeline::{CacheUsage, Step, StepContext, StepKind};
use crate::platform::Platform;
use async_trait::async_trait;
use tracing::{debug, info};

pub struct CacheRestoreStep;
pub struct CacheSaveStep;

fn cache_error(err: NightshiftError) -> NightshiftError {
    match err {
        NightshiftError::Cache(_) => err,
        other => NightshiftError::Cache(other.to_string()),
    }
}

fn disabled(config: &Config) -> Option<String> {
    (!config.cache.enabled).then(|| "cache disabled".to_string())
}

#[async_trait]
impl Step for CacheRestoreStep {
    fn kind(&self) -> StepKind {
        StepKind::CacheRestore
    }

    fn skip_reason(&self, config: &Config, _platform: Platform) -> Option<String> {
        disabled(config)
    }

    async fn execute(&self, ctx: &mut StepContext) -> NightshiftResult<String> {
        let cache = &ctx.config.cache;
        let key = compute_key(
            &ctx.workspace,
            &cache.manifests,
            &cache.prefix,
            ctx.platform,
            &ctx.config.provision.channel,
        );

        let key = match key {
            Ok(Some(key)) => key,
            Ok(None) => {
                ctx.cache_usage = CacheUsage::Miss;
                return Ok("no manifests to key on, full build".to_string());
            }
            Err(e) => {
                ctx.cache_usage = CacheUsage::Unavailable;
                return Err(cache_error(e));
            }
        };
        ctx.cache_key = Some(key.clone());

        match ctx.cache.restore(&key, &ctx.workspace).await {
            Ok(CacheLookup::Hit { restored }) => {
                info!("Cache hit: {}", key);
                ctx.cache_usage = CacheUsage::Hit;
                Ok(format!("hit {} ({} paths)", key, restored))
            }
            Ok(CacheLookup::Miss) => {
                debug!("Cache miss: {}", key);
                ctx.cache_usage = CacheUsage::Miss;
                Ok(format!("miss {}", key))
            }
            Err(e) => {
                ctx.cache_usage = CacheUsage::Unavailable;
                Err(cache_error(e))
            }
        }
    }
}

#[async_trait]
impl Step for CacheSaveStep {
    fn kind(&self) -> StepKind {
        StepKind::CacheSave
    }

    fn skip_reason(&self, config: &Config, _platform: Platform) -> Option<String> {
        disabled(config)
    }

    async fn execute(&self, ctx: &mut StepContext) -> NightshiftResult<String> {
        let Some(key) = ctx.cache_key.clone() else {
            return Ok("no cache key, nothing saved".to_string());
        };
        if ctx.cache_usage == CacheUsage::Hit {
            return Ok(format!("{} already complete", key));
        }

        let saved = ctx
            .cache
            .save(&key, &ctx.workspace, &ctx.config.cache.paths)
            .await
            .map_err(cache_error)?;

        if !saved {
            return Ok(format!("{} already complete", key));
        }

        let size = ctx
            .cache
            .list()
            .await
            .ok()
            .and_then(|entries| entries.into_iter().find(|e| e.key == key.as_string()))
            .map(|e| format_bytes(e.size_bytes))
            .unwrap_or_else(|| "unknown size".to_string());
        Ok(format!("saved {} ({})", key, size))
    }
}
