use super::*;

fn band(nchan: usize) -> Vec<f64> {
    (0..nchan)
        .map(|i| 1214.0 + i as f64 * (1537.0 - 1214.0) / (nchan - 1) as f64)
        .collect()
}

fn aligned_pulse(nchan: usize, nbin: usize, pulse_bin: usize, dm: f64) -> FreqVsPhase {
    let rows = (0..nchan)
        .map(|_| {
            let mut row = vec![1.0; nbin];
            row[pulse_bin] += 10.0;
            row
        })
        .collect();
    FreqVsPhase::new(band(nchan), 0.05, dm, rows).unwrap()
}

#[test]
fn test_profile_sums_channels() {
    let fvph = aligned_pulse(4, 16, 3, 0.0);
    let prof = fvph.profile();
    assert_eq!(prof.bins.len(), 16);
    assert_eq!(prof.bins[3], 44.0);
    assert_eq!(prof.bins[0], 4.0);
    assert_eq!(prof.max(), 44.0);
    assert_eq!(prof.median(), 4.0);
    assert_eq!(prof.peak_height(), 40.0);
}

#[test]
fn test_dedisperse_at_array_dm_is_identity() {
    let fvph = aligned_pulse(8, 64, 8, 100.0);
    for chan in 0..fvph.nchan() {
        assert_eq!(fvph.shift_bins(chan, 100.0), 0);
    }
    assert_eq!(fvph.dedispersed(100.0), fvph);
    assert_eq!(fvph.profile_at_dm(100.0), fvph.profile());
}

#[test]
fn test_dedisperse_rotates_low_channels_most() {
    let fvph = aligned_pulse(8, 64, 8, 100.0);
    let top = fvph.nchan() - 1;
    assert_eq!(fvph.shift_bins(top, 0.0), 0);
    let shifts: Vec<i64> = (0..fvph.nchan()).map(|c| fvph.shift_bins(c, 0.0)).collect();
    assert_eq!(shifts, vec![-136, -110, -86, -66, -47, -30, -14, 0]);

    let moved = fvph.dedispersed(0.0);
    assert_eq!(moved.profile().dm, 0.0);
    for (chan, &shift) in shifts.iter().enumerate() {
        let expected_bin = (8 - shift).rem_euclid(64) as usize;
        let row = moved.channel(chan);
        assert_eq!(row[expected_bin], 11.0, "channel {chan}");
        assert_eq!(row.iter().sum::<f64>(), 74.0);
    }
}

#[test]
fn test_dedisperse_round_trip() {
    let fvph = aligned_pulse(8, 64, 8, 100.0);
    let back = fvph.dedispersed(0.0).dedispersed(100.0);
    assert_eq!(back, fvph);
}

#[test]
fn test_smeared_profile_has_lower_peak() {
    let fvph = aligned_pulse(8, 64, 8, 100.0);
    assert_eq!(fvph.profile_at_dm(100.0).peak_height(), 80.0);
    assert_eq!(fvph.profile_at_dm(0.0).peak_height(), 10.0);
}

#[test]
fn test_new_rejects_malformed_arrays() {
    assert!(FreqVsPhase::new(vec![], 1.0, 0.0, vec![]).is_err());
    assert!(FreqVsPhase::new(vec![1400.0], 1.0, 0.0, vec![vec![1.0], vec![2.0]]).is_err());
    let ragged = vec![vec![1.0, 2.0], vec![3.0]];
    assert!(FreqVsPhase::new(vec![1400.0, 1300.0], 1.0, 0.0, ragged).is_err());
    assert!(FreqVsPhase::new(vec![1400.0], 0.0, 0.0, vec![vec![1.0]]).is_err());
    assert!(FreqVsPhase::new(vec![-1.0], 1.0, 0.0, vec![vec![1.0]]).is_err());
    assert!(FreqVsPhase::new(vec![1400.0], 1.0, 0.0, vec![vec![]]).is_err());
}

#[test]
fn test_new_rejects_non_finite_samples() {
    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let rows = vec![vec![1.0, 2.0, 1.0], vec![1.0, bad, 1.0]];
        let err = FreqVsPhase::new(vec![1214.0, 1537.0], 0.05, 10.0, rows).unwrap_err();
        assert_eq!(
            err,
            SourceError::Malformed("channel 1 has a non-finite sample".to_string())
        );
    }
}

#[test]
fn test_median_even_and_odd() {
    assert_eq!(median_f64(&[3.0, 1.0, 2.0]), 2.0);
    assert_eq!(median_f64(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    assert!(median_f64(&[]).is_nan());
}

#[test]
fn test_product_names() {
    let names: Vec<&str> = ProductKind::ALL.iter().map(|k| k.name()).collect();
    assert_eq!(names, vec!["freq_vs_phase", "pfd", "spd", "profile"]);
    assert_eq!(ProductKind::Fold.to_string(), "pfd");
}
