//! Room code generation.
//!
//! Codes are six letters drawn independently and uniformly from `a..=z`,
//! about 3×10^8 possibilities. Nothing here checks uniqueness; the
//! registry retries on collision.

use gambit_protocol::RoomCode;
use rand::Rng;

/// Generates a random room code using the thread-local RNG.
pub fn generate() -> RoomCode {
    generate_with(&mut rand::rng())
}

/// Generates a random room code from the given RNG.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> RoomCode {
    let letters: String = (0..RoomCode::LEN)
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect();
    RoomCode::parse(&letters).expect("letters are drawn from a..=z")
}
