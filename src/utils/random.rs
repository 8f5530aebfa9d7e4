use std::io::{self, Error, ErrorKind};

use ring::rand::{SecureRandom, SystemRandom};

/// Fills a buffer with bytes from the operating system's CSPRNG.
pub fn fill_random(buf: &mut [u8]) -> io::Result<()> {
    SystemRandom::new()
        .fill(buf)
        .map_err(|_| Error::new(ErrorKind::Other, "The system random number generator failed"))
}

/// Returns an array filled with bytes from the operating system's CSPRNG.
pub fn random_array<const N: usize>() -> io::Result<[u8; N]> {
    let mut array = [0u8; N];
    fill_random(&mut array)?;
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::random_array;

    #[test]
    fn test_random_arrays_differ() {
        let a = random_array::<32>().unwrap();
        let b = random_array::<32>().unwrap();
        assert_ne!(a, b);
    }
}
