//! Spreading of worker pool sizes over the zones of the pool.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::error::DelegateError;

/// Share of `size` assigned to the zone `zone_index` out of `zone_count`,
/// the remainder goes to the first zones.
pub fn distribute_over_zones(zone_index: i32, size: i32, zone_count: i32) -> i32 {
    if zone_count <= 0 {
        return size;
    }

    let remainder = if zone_index < size % zone_count { 1 } else { 0 };

    size / zone_count + remainder
}

/// Distributes an absolute value like [`distribute_over_zones`] and reweighs a
/// percentage so it still refers to the zone's share of `total`.
pub fn distribute_positive_int_or_percent(
    zone_index: i32,
    value: &IntOrString,
    zone_count: i32,
    total: i32,
) -> Result<IntOrString, DelegateError> {
    Ok(match value {
        IntOrString::Int(size) => {
            IntOrString::Int(distribute_over_zones(zone_index, *size, zone_count))
        }
        IntOrString::String(percent) => {
            match distribute_percent_over_zones(zone_index, percent, zone_count, total)? {
                Some(percent) => IntOrString::String(percent),
                None => value.clone(),
            }
        }
    })
}

fn distribute_percent_over_zones(
    zone_index: i32,
    percent: &str,
    zone_count: i32,
    total: i32,
) -> Result<Option<String>, DelegateError> {
    let Some(mut percents) = percent
        .strip_suffix('%')
        .and_then(|percents| percents.trim().parse::<i64>().ok())
    else {
        return Ok(None);
    };

    if zone_count > 0 && total % zone_count != 0 {
        let machines = distribute_over_zones(zone_index, total, zone_count);

        if machines > 0 {
            percents = i64::from(total)
                .checked_mul(percents)
                .map(|weighted| weighted / (i64::from(zone_count) * i64::from(machines)))
                .ok_or_else(|| DelegateError::InvalidPercentage(percent.to_owned()))?;
        }
    }

    Ok(Some(format!("{percents}%")))
}
