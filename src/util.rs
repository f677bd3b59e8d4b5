// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.


/// Helper for converting a floating number to a non-negative integer, or a
/// suitable error if it is further than `tolerance` from one.
pub fn num_to_int<T>(inp: f64, tolerance: f64, err: impl FnOnce(f64) -> T) -> Result<u32, T> {
    let v = inp.round();
    if (v - inp).abs() <= tolerance && v >= 0. && v <= u32::MAX as f64 {
        Ok(v as u32)
    } else {
        Err(err(inp))
    }
}

#[cfg(test)]
mod tests {
    use super::num_to_int;

    #[test]
    fn test_num_to_int() {
        assert_eq!(num_to_int(2.0000001, 1e-6, |_| ()), Ok(2));
        assert_eq!(num_to_int(1.9999999, 1e-6, |_| ()), Ok(2));
        assert_eq!(num_to_int(0., 1e-6, |_| ()), Ok(0));
        assert_eq!(num_to_int(2.5, 1e-6, |n| n), Err(2.5));
        assert_eq!(num_to_int(2.00001, 1e-6, |n| n), Err(2.00001));
        assert_eq!(num_to_int(-1., 1e-6, |n| n), Err(-1.));
        assert!(num_to_int(f64::NAN, 1e-6, |_| ()).is_err());
    }
}
