//! Rolling restarts triggered through the restart marker annotation.
use std::{collections::BTreeMap, num::ParseIntError};

use k8s_openapi::api::apps::v1::Deployment;
use snafu::{OptionExt, ResultExt, Snafu};

use crate::kvp::RESTARTED_AT_ANNOTATION_KEY;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("restart marker {value:?} is not a base-10 integer"))]
    MalformedRestartMarker {
        source: ParseIntError,
        value: String,
    },

    #[snafu(display("restart marker {value} cannot be incremented without overflowing"))]
    RestartMarkerOverflow { value: i64 },
}

/// The marker value following `current`. An absent marker starts at `1`.
pub fn next_restart_marker(current: Option<&str>) -> Result<String> {
    let Some(current) = current else {
        return Ok("1".to_owned());
    };

    let value: i64 = current
        .parse()
        .context(MalformedRestartMarkerSnafu { value: current })?;
    let next = value
        .checked_add(1)
        .context(RestartMarkerOverflowSnafu { value })?;

    Ok(next.to_string())
}

/// Bumps the restart marker annotation in memory and returns its new value.
///
/// Nothing is modified if the current marker cannot be incremented.
pub fn stage_restart(deployment: &mut Deployment) -> Result<String> {
    let annotations = deployment
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new);

    let next = next_restart_marker(
        annotations
            .get(RESTARTED_AT_ANNOTATION_KEY)
            .map(String::as_str),
    )?;
    annotations.insert(RESTARTED_AT_ANNOTATION_KEY.to_owned(), next.clone());

    Ok(next)
}

/// The current restart marker of the Deployment, if set.
pub fn restart_marker(deployment: &Deployment) -> Option<&str> {
    deployment
        .metadata
        .annotations
        .as_ref()?
        .get(RESTARTED_AT_ANNOTATION_KEY)
        .map(String::as_str)
}
