use rand::Rng;

pub mod config;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                            abcdefghijklmnopqrstuvwxyz\
                            0123456789";

/// Create a random secret with the given length
pub fn create_random_secret(secret_len: usize) -> String {
    let mut rng = rand::thread_rng();

    (0..secret_len)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Create a short public identifier for a booking.
///
/// Lowercase alphanumeric so it is safe to put in URLs and iCalendar UIDs.
pub fn create_booking_uid() -> String {
    create_random_secret(22).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_creates_random_secret() {
        let len = 30;
        let sec1 = create_random_secret(len);
        let sec2 = create_random_secret(len);
        assert_eq!(sec1.len(), 30);
        assert_eq!(sec2.len(), 30);
        assert_ne!(sec2, sec1);

        let len = 47;
        assert_eq!(len, create_random_secret(len).len())
    }

    #[test]
    fn it_creates_url_safe_booking_uids() {
        let uid = create_booking_uid();
        assert_eq!(uid.len(), 22);
        assert!(uid.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(uid, uid.to_lowercase());
    }
}
