//! scd-domain - Contractor jobs, timelogs and payments as versioned entities.
//!
//! Each type keeps its full history through `scd-core`. Timelogs and payment
//! line items reference the exact job (and timelog) *version* they were
//! recorded against, so later edits never change what was billed.

pub mod job;
pub mod payment;
pub mod seed;
pub mod timelog;

use std::sync::Arc;

use scd_core::{Database, ScdResult, SqliteVersionStore, StoreConfig, VersionStore};

pub use job::{Job, JobService, JobStatus, NewJob};
pub use payment::{NewPaymentLineItem, PaymentLineItem, PaymentService, PaymentStatus, PaymentUpdate};
pub use timelog::{LogType, NewTimelog, Timelog, TimelogService, TimelogUpdate};

/// One store per entity type, all on the same database.
#[derive(Clone)]
pub struct DomainStores {
    pub jobs: Arc<dyn VersionStore<Job>>,
    pub timelogs: Arc<dyn VersionStore<Timelog>>,
    pub payments: Arc<dyn VersionStore<PaymentLineItem>>,
}

/// Services wired to a [`DomainStores`].
#[derive(Clone)]
pub struct DomainServices {
    pub jobs: JobService,
    pub timelogs: TimelogService,
    pub payments: PaymentService,
}

impl DomainStores {
    /// Create the stores (and their tables) on `db`.
    pub fn new(db: Database) -> ScdResult<Self> {
        Self::with_config(db, &StoreConfig::default())
    }

    pub fn with_config(db: Database, config: &StoreConfig) -> ScdResult<Self> {
        Ok(Self {
            jobs: Arc::new(SqliteVersionStore::<Job>::with_config(db.clone(), config)?),
            timelogs: Arc::new(SqliteVersionStore::<Timelog>::with_config(db.clone(), config)?),
            payments: Arc::new(SqliteVersionStore::<PaymentLineItem>::with_config(db, config)?),
        })
    }

    /// Open the database named by `config` and create the stores on it.
    pub fn from_config(config: &StoreConfig) -> ScdResult<Self> {
        Self::with_config(Database::from_config(config)?, config)
    }

    pub fn services(&self) -> DomainServices {
        DomainServices {
            jobs: JobService::new(self.jobs.clone()),
            timelogs: TimelogService::new(self.timelogs.clone(), self.jobs.clone()),
            payments: PaymentService::new(
                self.payments.clone(),
                self.jobs.clone(),
                self.timelogs.clone(),
            ),
        }
    }
}
