//! stallscope - CPU pressure sampling for stall diagnosis.
//!
//! This library provides the sampling pipeline behind:
//! - `stallscoped` - background daemon ticking the sampler
//!
//! A [`sampler::CpuSampler`] periodically reads raw CPU counter lines
//! through a [`source::CounterSource`], converts consecutive readings
//! into utilization percentages, and keeps a short bounded history.
//! [`history::RateHistory::is_busy`] answers, after an execution stall
//! was detected elsewhere, whether the CPU was under pressure around
//! the stall window.

pub mod history;
pub mod parser;
pub mod rates;
pub mod sampler;
pub mod source;
pub mod ticker;
