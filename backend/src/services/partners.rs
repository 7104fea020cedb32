//! Partner capital accounts: balances, movement history and deletions

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::{
    aggregate_partner_ledger, deletion_policy, merge_with_roster, parse_origin,
    sort_partner_balances, CapitalMovement, CapitalMovementKind, DeletionPolicy, MovementFilter,
    MovementOrigin, Partner, PartnerBalance, PartnerSort,
};
use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::store::{decode_row, decode_rows, Collection, Filter, RecordStore};

#[derive(Clone)]
pub struct PartnerService {
    store: Arc<dyn RecordStore>,
}

/// History row annotated with where the movement came from
#[derive(Debug, Clone, Serialize)]
pub struct MovementView {
    #[serde(flatten)]
    pub movement: CapitalMovement,
    pub origin: MovementOrigin,
}

fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    shared::validate_positive_amount(*value).map_err(|msg| {
        let mut err = ValidationError::new("positive");
        err.message = Some(msg.into());
        err
    })
}

/// Input for a manual contribution or withdrawal
#[derive(Debug, Deserialize, Validate)]
pub struct RecordCapitalInput {
    pub partner_id: i64,
    pub kind: CapitalMovementKind,
    #[validate(custom = "positive_amount")]
    pub amount: Decimal,
    pub date: Option<NaiveDate>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

fn kind_label(kind: CapitalMovementKind) -> &'static str {
    match kind {
        CapitalMovementKind::Contribution => "Aporte",
        CapitalMovementKind::Withdrawal => "Retiro",
        CapitalMovementKind::Unknown => "Desconocido",
    }
}

impl PartnerService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn all_movements(&self, filters: &[Filter]) -> AppResult<Vec<CapitalMovement>> {
        let rows = self.store.fetch_all(Collection::WalletMovements, filters).await?;
        Ok(decode_rows(Collection::WalletMovements, rows))
    }

    /// Balance per partner, including partners that never moved money
    #[tracing::instrument(skip(self))]
    pub async fn balances(&self, sort: PartnerSort) -> AppResult<Vec<PartnerBalance>> {
        let movements = self.all_movements(&[]).await?;
        let partners: Vec<Partner> = decode_rows(
            Collection::Partners,
            self.store.fetch_all(Collection::Partners, &[]).await?,
        );

        let ledger = aggregate_partner_ledger(&movements);
        let mut rows = merge_with_roster(&ledger, &partners);
        sort_partner_balances(&mut rows, sort);
        Ok(rows)
    }

    /// Movement history, newest first, capped at `limit` rows
    #[tracing::instrument(skip(self))]
    pub async fn movements(&self, filter: MovementFilter, limit: usize) -> AppResult<Vec<MovementView>> {
        let mut store_filters = Vec::new();
        if let Some(partner_id) = filter.partner_id {
            store_filters.push(Filter::eq("socio_id", partner_id));
        }

        let mut movements: Vec<CapitalMovement> = self
            .all_movements(&store_filters)
            .await?
            .into_iter()
            .filter(|m| filter.matches(m))
            .collect();
        movements.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        movements.truncate(limit);

        Ok(movements
            .into_iter()
            .map(|movement| MovementView {
                origin: parse_origin(movement.description.as_deref()),
                movement,
            })
            .collect())
    }

    /// Record a manual movement
    #[tracing::instrument(skip(self, input), fields(partner_id = input.partner_id))]
    pub async fn record_movement(&self, input: RecordCapitalInput) -> AppResult<MovementView> {
        input.validate()?;
        if input.kind == CapitalMovementKind::Unknown {
            return Err(AppError::validation(
                "kind",
                "Movement kind must be contribution or withdrawal",
                "El tipo debe ser aporte o retiro",
            ));
        }
        if self.store.fetch_one(Collection::Partners, input.partner_id).await?.is_none() {
            return Err(AppError::NotFound("Partner".to_string()));
        }

        let date = input.date.unwrap_or_else(|| Utc::now().date_naive());
        let row = self
            .store
            .insert(
                Collection::WalletMovements,
                json!({
                    "socio_id": input.partner_id,
                    "tipo": kind_label(input.kind),
                    "monto": input.amount,
                    "fecha": date,
                    "descripcion": input.description,
                }),
            )
            .await?;
        let movement: CapitalMovement = decode_row(Collection::WalletMovements, row)?;
        tracing::info!(amount = %movement.amount, "Capital movement recorded");

        Ok(MovementView {
            origin: parse_origin(movement.description.as_deref()),
            movement,
        })
    }

    /// Delete a movement unless it still belongs to an existing expense
    #[tracing::instrument(skip(self))]
    pub async fn delete_movement(&self, movement_id: i64) -> AppResult<DeletionPolicy> {
        let row = self
            .store
            .fetch_one(Collection::WalletMovements, movement_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Capital movement".to_string()))?;
        let movement: CapitalMovement = decode_row(Collection::WalletMovements, row)?;
        let origin = parse_origin(movement.description.as_deref());

        let origin_exists = match origin.origin_id.as_deref().map(str::parse::<i64>) {
            Some(Ok(expense_id)) => self
                .store
                .fetch_one(Collection::Expenses, expense_id)
                .await?
                .is_some(),
            _ => false,
        };

        let policy = deletion_policy(&origin, origin_exists);
        if let DeletionPolicy::Blocked { origin_id } = &policy {
            tracing::info!(%origin_id, "Deletion blocked by linked expense");
            return Err(AppError::Conflict {
                resource: "capital_movement".to_string(),
                message: format!(
                    "Movement was generated by expense {}; delete the expense instead",
                    origin_id
                ),
                message_es: format!(
                    "El movimiento fue generado por el gasto {}; elimine el gasto",
                    origin_id
                ),
            });
        }

        if !self.store.delete(Collection::WalletMovements, movement_id).await? {
            return Err(AppError::NotFound("Capital movement".to_string()));
        }
        if policy == DeletionPolicy::AllowedOrphan {
            tracing::warn!("Deleted system movement without a live origin");
        }
        Ok(policy)
    }
}
