use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::info;

use backend_domain::utils::current_millis;
use backend_domain::value_objects::{Currency, Money, ParcelStatus, QrTargetKind, Weight};
use backend_domain::{IntakeEnvelope, Parcel, ParcelIntake, ParcelRegistration, QrCode};

use crate::{AppError, AppState};

/// Registers a batch of parcels in `created` and binds one QR code each.
pub async fn register_parcels(
    state: &AppState,
    envelope: IntakeEnvelope,
) -> Result<Vec<ParcelRegistration>, AppError> {
    if envelope.parcels.is_empty() {
        return Err(AppError::BadRequest(
            "intake contains no parcels".to_string(),
        ));
    }

    let now = current_millis();
    let mut registrations = Vec::with_capacity(envelope.parcels.len());
    for intake in envelope.parcels {
        let registration = register_one(state, intake, now).await?;
        registrations.push(registration);
    }

    state.metrics.record_parcels_registered(registrations.len());
    info!(count = registrations.len(), "parcels registered");
    Ok(registrations)
}

async fn register_one(
    state: &AppState,
    intake: ParcelIntake,
    now: i64,
) -> Result<ParcelRegistration, AppError> {
    let tracking_number = intake.tracking_number.trim().to_string();
    if tracking_number.is_empty() {
        return Err(AppError::BadRequest(
            "tracking_number must not be empty".to_string(),
        ));
    }
    if state.stations.get(&intake.station_id).await?.is_none() {
        return Err(AppError::BadRequest(format!(
            "unknown station '{}'",
            intake.station_id
        )));
    }

    let currency = match &intake.currency {
        Some(raw) => Currency::from_str(raw)?,
        None => state.config.default_currency,
    };
    let weight = Weight::from_kg(intake.weight_kg)?;
    let declared_value = Money::new(intake.declared_value.unwrap_or(Decimal::ZERO), currency)?;
    let cod_amount = Money::new(intake.cod_amount.unwrap_or(Decimal::ZERO), currency)?;

    let parcel = Parcel {
        id: uuid::Uuid::new_v4().to_string(),
        tracking_number: tracking_number.clone(),
        sender: intake.sender,
        receiver: intake.receiver,
        weight,
        declared_value,
        cod_amount,
        fragile: intake.fragile,
        signature_required: intake.signature_required,
        status: ParcelStatus::Created,
        station_id: intake.station_id,
        sort_bin: None,
        route_code: None,
        manifest_id: None,
        version: 0,
        created_at: now,
        updated_at: now,
    };
    state.parcels.insert(&parcel).await?;

    let code = format!("PCL-{}", uuid::Uuid::new_v4().simple());
    let qr = QrCode::new(code, QrTargetKind::Parcel, parcel.id.clone(), None, now);
    state.qr_codes.bind(&qr).await?;

    Ok(ParcelRegistration { parcel, qr })
}
