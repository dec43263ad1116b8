//! Query Planner
//!
//! Runs the binder and the plan builder for one statement and applies the
//! caller-level policies around them: the `DROP ... IF EXISTS` notice and
//! marking the transaction must-abort after a failed DDL statement.

use crate::binder::{Binder, BoundStatement};
use crate::catalog::{Catalog, CatalogAccessor, CatalogReader, TransactionContext};
use crate::common::config::PlannerConfig;
use crate::common::error::BindResult;
use crate::parser::{ParseResult, Statement};
use crate::planner::logical_plan::LogicalPlan;
use crate::planner::plan_builder::PlanBuilder;
use crate::types::{LogicalType, Value};
use std::sync::Arc;
use tracing::debug;

/// A bound statement together with its logical plan
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStatement {
    pub bound: BoundStatement,
    pub plan: LogicalPlan,
    /// Inferred placeholder types, for the prepared-statement cache
    pub parameter_types: Vec<LogicalType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Planned(Box<PlannedStatement>),
    /// The statement is a no-op; the message is reported to the client
    Notice(String),
}

/// Main query planner
#[derive(Debug, Clone, Default)]
pub struct QueryPlanner {
    config: PlannerConfig,
}

impl QueryPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Accessor for the configured database and namespace under `txn`
    pub fn accessor(
        &self,
        catalog: &Arc<Catalog>,
        txn: Arc<TransactionContext>,
    ) -> BindResult<CatalogReader> {
        catalog.accessor(&self.config.database, &self.config.default_namespace, txn)
    }

    /// Bind and lower one statement. `parameters` are promoted in place to the
    /// inferred placeholder types when binding succeeds.
    pub fn plan(
        &self,
        accessor: &dyn CatalogAccessor,
        parse: ParseResult,
        parameters: &mut [Value],
    ) -> BindResult<PlanOutcome> {
        let is_ddl = parse.statement.is_ddl();
        let drop_if_exists = matches!(&parse.statement, Statement::Drop(drop) if drop.if_exists);

        match self.bind_and_transform(accessor, parse, parameters) {
            Ok(planned) => {
                if self.config.log_plans {
                    debug!(plan = %planned.plan, "logical plan");
                }
                Ok(PlanOutcome::Planned(Box::new(planned)))
            }
            Err(e) if drop_if_exists && self.config.drop_if_exists_notice && e.is_undefined_object() => {
                debug!(error = %e, "DROP IF EXISTS on a missing object");
                Ok(PlanOutcome::Notice(format!("{}, skipping", e.message())))
            }
            Err(e) => {
                if is_ddl {
                    accessor.transaction().set_must_abort();
                }
                debug!(code = %e.code(), error = %e, "planning failed");
                Err(e)
            }
        }
    }

    fn bind_and_transform(
        &self,
        accessor: &dyn CatalogAccessor,
        parse: ParseResult,
        parameters: &mut [Value],
    ) -> BindResult<PlannedStatement> {
        let mut bound = Binder::new(accessor).bind(parse, parameters)?;
        let plan = PlanBuilder::new(accessor).transform(&mut bound)?;
        let parameter_types = bound.parameter_types.clone();
        Ok(PlannedStatement {
            bound,
            plan,
            parameter_types,
        })
    }
}
