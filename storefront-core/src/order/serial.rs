use rand::Rng;

/// Build an order serial number: `YYYYMMDD` followed by six random digits.
///
/// Uniqueness per user is checked by the caller.
pub fn generate_order_sn<R: Rng + ?Sized>(date: time::Date, rng: &mut R) -> String {
    let suffix: u32 = rng.random_range(0..1_000_000);
    format!(
        "{:04}{:02}{:02}{:06}",
        date.year(),
        u8::from(date.month()),
        date.day(),
        suffix
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_order_sn_format() {
        let date = time::macros::date!(2024 - 03 - 07);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let sn = generate_order_sn(date, &mut rng);
            assert_eq!(sn.len(), 14);
            assert!(sn.starts_with("20240307"));
            assert!(sn.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
