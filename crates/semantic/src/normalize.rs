/// In-place L2 normalization. Zero vectors are left untouched.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_to_unit_length() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize_in_place(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_stays_zero() {
        let mut v = vec![0.0f32; 4];
        l2_normalize_in_place(&mut v);
        assert_eq!(v, vec![0.0; 4]);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut v = vec![-1.0f32, 2.0, -3.0, 4.0];
        l2_normalize_in_place(&mut v);
        let once = v.clone();
        l2_normalize_in_place(&mut v);
        for (a, b) in v.iter().zip(&once) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
