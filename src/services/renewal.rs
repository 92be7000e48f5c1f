// src/services/renewal.rs
//
// Calculadora de renovaciones: funciones puras sobre fechas. El "hoy" se
// inyecta siempre como parámetro para que los tests puedan fijarlo.

use chrono::{Days, Months, NaiveDate};

use crate::{
    common::error::AppError,
    models::{
        catalog::{DocumentType, EffectiveRenewal, RenewalUnit, TemplateItem},
        requirements::{Urgency, UrgencyTier},
    },
};

/// Suma `period` unidades a `base`.
///
/// Meses y años usan aritmética de calendario con recorte al último día del
/// mes destino (31 ene + 1 mes = 28/29 feb; 29 feb + 1 año = 28 feb).
pub fn compute_next_date(
    base: NaiveDate,
    period: i32,
    unit: RenewalUnit,
) -> Result<NaiveDate, AppError> {
    if period <= 0 {
        return Err(AppError::InvalidRenewalSpec(period));
    }

    let next = match unit {
        RenewalUnit::Days => base.checked_add_days(Days::new(period as u64)),
        RenewalUnit::Weeks => base.checked_add_days(Days::new(period as u64 * 7)),
        RenewalUnit::Months => base.checked_add_months(Months::new(period as u32)),
        RenewalUnit::Years => base.checked_add_months(Months::new(period as u32 * 12)),
    };

    next.ok_or_else(|| AppError::InternalServerError(anyhow::anyhow!("fecha fuera de rango")))
}

/// Atajo sobre una renovación ya resuelta.
pub fn apply_renewal(base: NaiveDate, renewal: EffectiveRenewal) -> Result<NaiveDate, AppError> {
    compute_next_date(base, renewal.period, renewal.unit)
}

/// Clasifica la urgencia de una fecha objetivo respecto a una fecha de
/// referencia. Los cortes son exactos y los dashboards, los filtros y la
/// elegibilidad de correo dependen de ellos:
///
///   < 0 días  -> expired    (days_expired = -days_until)
///   0..=7     -> urgent
///   8..=15    -> high
///   16..=30   -> medium
///   > 30      -> ok
pub fn classify_urgency(reference: NaiveDate, target: NaiveDate) -> Urgency {
    let days_until = (target - reference).num_days();

    let tier = match days_until {
        d if d < 0 => UrgencyTier::Expired,
        0..=7 => UrgencyTier::Urgent,
        8..=15 => UrgencyTier::High,
        16..=30 => UrgencyTier::Medium,
        _ => UrgencyTier::Ok,
    };

    Urgency { tier, days_until }
}

/// Resuelve la cadena de precedencia de renovación en un solo lugar:
/// override del ítem de plantilla > default del tipo > sin vencimiento.
pub fn resolve_effective_renewal(
    item: &TemplateItem,
    document_type: &DocumentType,
) -> Option<EffectiveRenewal> {
    if item.has_custom_renewal {
        if let (Some(period), Some(unit)) = (item.custom_renewal_period, item.custom_renewal_unit) {
            return Some(EffectiveRenewal { period, unit });
        }
    }
    document_type.renewal_spec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use crate::models::requirements::Priority;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn doc_type(has_expiration: bool, period: Option<i32>, unit: Option<RenewalUnit>) -> DocumentType {
        let now = DateTime::<Utc>::MIN_UTC;
        DocumentType {
            id: Uuid::new_v4(),
            name: "Certificado Médico".to_string(),
            category: "medico".to_string(),
            description: None,
            is_mandatory: true,
            has_expiration,
            renewal_period: period,
            renewal_unit: unit,
            default_due_days: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn template_item(
        type_id: Uuid,
        custom: Option<(i32, RenewalUnit)>,
    ) -> TemplateItem {
        TemplateItem {
            id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            document_type_id: type_id,
            priority: Priority::Urgente,
            has_custom_renewal: custom.is_some(),
            custom_renewal_period: custom.map(|(p, _)| p),
            custom_renewal_unit: custom.map(|(_, u)| u),
        }
    }

    #[test]
    fn adds_days_and_weeks_as_plain_days() {
        let base = date(2024, 3, 1);
        assert_eq!(compute_next_date(base, 30, RenewalUnit::Days).unwrap(), date(2024, 3, 31));
        assert_eq!(compute_next_date(base, 2, RenewalUnit::Weeks).unwrap(), date(2024, 3, 15));
    }

    #[test]
    fn month_addition_clamps_to_end_of_month() {
        // 31 ene + 1 mes cae en el último día de febrero
        assert_eq!(
            compute_next_date(date(2024, 1, 31), 1, RenewalUnit::Months).unwrap(),
            date(2024, 2, 29)
        );
        assert_eq!(
            compute_next_date(date(2023, 1, 31), 1, RenewalUnit::Months).unwrap(),
            date(2023, 2, 28)
        );
    }

    #[test]
    fn year_addition_clamps_leap_day() {
        assert_eq!(
            compute_next_date(date(2024, 2, 29), 1, RenewalUnit::Years).unwrap(),
            date(2025, 2, 28)
        );
        assert_eq!(
            compute_next_date(date(2024, 2, 29), 4, RenewalUnit::Years).unwrap(),
            date(2028, 2, 29)
        );
    }

    #[test]
    fn repeated_month_additions_from_anchor_do_not_drift() {
        // Sumar k meses desde el mismo ancla preserva el día salvo recorte.
        let anchor = date(2024, 1, 31);
        assert_eq!(compute_next_date(anchor, 2, RenewalUnit::Months).unwrap(), date(2024, 3, 31));
        assert_eq!(compute_next_date(anchor, 3, RenewalUnit::Months).unwrap(), date(2024, 4, 30));
        assert_eq!(compute_next_date(anchor, 12, RenewalUnit::Months).unwrap(), date(2025, 1, 31));
        // 12 meses y 1 año desde el mismo ancla coinciden
        assert_eq!(
            compute_next_date(anchor, 12, RenewalUnit::Months).unwrap(),
            compute_next_date(anchor, 1, RenewalUnit::Years).unwrap()
        );
    }

    #[test]
    fn rejects_non_positive_periods() {
        for period in [0, -3] {
            match compute_next_date(date(2024, 1, 1), period, RenewalUnit::Days) {
                Err(AppError::InvalidRenewalSpec(p)) => assert_eq!(p, period),
                other => panic!("se esperaba InvalidRenewalSpec, se obtuvo {other:?}"),
            }
        }
    }

    #[test]
    fn urgency_boundaries_are_exact() {
        let today = date(2024, 6, 1);
        let at = |days: i64| classify_urgency(today, today + chrono::Duration::days(days));

        assert_eq!(at(0).tier, UrgencyTier::Urgent);
        assert_eq!(at(7).tier, UrgencyTier::Urgent);
        assert_eq!(at(8).tier, UrgencyTier::High);
        assert_eq!(at(15).tier, UrgencyTier::High);
        assert_eq!(at(16).tier, UrgencyTier::Medium);
        assert_eq!(at(30).tier, UrgencyTier::Medium);
        assert_eq!(at(31).tier, UrgencyTier::Ok);

        let expired = at(-1);
        assert_eq!(expired.tier, UrgencyTier::Expired);
        assert_eq!(expired.days_expired(), Some(1));
    }

    #[test]
    fn template_override_wins_over_type_default() {
        let dt = doc_type(true, Some(12), Some(RenewalUnit::Months));
        let item = template_item(dt.id, Some((6, RenewalUnit::Months)));

        let effective = resolve_effective_renewal(&item, &dt).unwrap();
        assert_eq!(effective.period, 6);
        assert_eq!(effective.unit, RenewalUnit::Months);
    }

    #[test]
    fn falls_back_to_type_default_then_to_none() {
        let dt = doc_type(true, Some(12), Some(RenewalUnit::Months));
        let item = template_item(dt.id, None);
        assert_eq!(
            resolve_effective_renewal(&item, &dt),
            Some(EffectiveRenewal { period: 12, unit: RenewalUnit::Months })
        );

        let no_expiry = doc_type(false, None, None);
        let item = template_item(no_expiry.id, None);
        assert_eq!(resolve_effective_renewal(&item, &no_expiry), None);
    }

    #[test]
    fn medico_general_scenario_expires_mid_year() {
        // Plantilla con override de 6 meses sobre un tipo de 12: aprobar el
        // 2024-01-20 vence el 2024-07-20, y diez días antes es nivel `high`.
        let dt = doc_type(true, Some(12), Some(RenewalUnit::Months));
        let item = template_item(dt.id, Some((6, RenewalUnit::Months)));

        let effective = resolve_effective_renewal(&item, &dt).unwrap();
        let expiration = apply_renewal(date(2024, 1, 20), effective).unwrap();
        assert_eq!(expiration, date(2024, 7, 20));

        let urgency = classify_urgency(date(2024, 7, 10), expiration);
        assert_eq!(urgency.tier, UrgencyTier::High);
        assert_eq!(urgency.days_until, 10);
    }
}
