// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Camera enumeration and validation
//!
//! Resolves the ordered list of [`CameraRequest`]s to distinct physical
//! sensor handles. Every sensor can be claimed by at most one request, and a
//! request id must index an existing sensor: ids equal to or beyond the
//! sensor count are rejected.

use crate::{config::CameraRequest, Error};

/// Claims one sensor per request, preserving request order.
///
/// `sensors` is the full hardware list as returned by
/// [`crate::backend::CaptureBackend::enumerate_sensors`]. Sensors that are not
/// requested are dropped.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if no sensors are available, if an id is
/// out of range, or if two requests name the same sensor.
pub fn claim_sensors<S>(requests: &[CameraRequest], sensors: Vec<S>) -> Result<Vec<S>, Error> {
    if sensors.is_empty() {
        return Err(Error::Configuration("could not find any cameras".to_string()));
    }

    let count = sensors.len();
    let mut available: Vec<Option<S>> = sensors.into_iter().map(Some).collect();
    let mut claimed = Vec::with_capacity(requests.len());

    for request in requests {
        let index = request.id as usize;
        if index >= count {
            return Err(Error::Configuration(format!(
                "could not find camera with id \"{}\", {} camera(s) available",
                request.id, count
            )));
        }
        match available[index].take() {
            Some(sensor) => claimed.push(sensor),
            None => {
                return Err(Error::Configuration(format!(
                    "camera with id \"{}\" used twice",
                    request.id
                )))
            }
        }
        log::debug!("camera \"{}\" claimed sensor {}", request.name, request.id);
    }

    Ok(claimed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;

    fn requests(ids: &[u32]) -> Vec<CameraRequest> {
        ids.iter()
            .map(|id| CameraRequest::new(*id, &format!("cam{}", id)))
            .collect()
    }

    #[test]
    fn test_preserves_request_order() {
        let claimed = claim_sensors(&requests(&[2, 0, 1]), vec!['a', 'b', 'c']).unwrap();
        assert_eq!(claimed, vec!['c', 'a', 'b']);
    }

    #[test]
    fn test_subset_of_sensors() {
        let claimed = claim_sensors(&requests(&[3]), vec![10, 11, 12, 13]).unwrap();
        assert_eq!(claimed, vec![13]);
    }

    #[test]
    fn test_random_permutations_never_alias() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let mut ids: Vec<u32> = (0..8).collect();
            ids.shuffle(&mut rng);
            let take = (ids[0] as usize % 8) + 1;
            let ids = &ids[..take];

            let claimed = claim_sensors(&requests(ids), (0..8u32).collect()).unwrap();
            assert_eq!(claimed, ids);
        }
    }

    #[test]
    fn test_no_sensors() {
        let err = claim_sensors::<u32>(&requests(&[0]), Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_id_equal_to_count_rejected() {
        let err = claim_sensors(&requests(&[2]), vec![0, 1]).unwrap_err();
        match err {
            Error::Configuration(msg) => assert!(msg.contains("\"2\"")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = claim_sensors(&requests(&[1, 0, 1]), vec![0, 1, 2]).unwrap_err();
        match err {
            Error::Configuration(msg) => assert!(msg.contains("used twice")),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
