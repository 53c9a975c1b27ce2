use rand::prelude::{SeedableRng, StdRng};
use uuid::Uuid;

pub fn create_rng_from_uuid(uuid: Uuid) -> StdRng {
    let uuid_bytes: &[u8; 16] = uuid.as_bytes();
    let mut seed = [0; 32];
    seed[..16].clone_from_slice(uuid_bytes);
    seed[16..32].clone_from_slice(uuid_bytes);

    StdRng::from_seed(seed)
}

/// A fixed seed gives a reproducible stream, otherwise the stream is seeded from a fresh uuid.
pub fn create_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => create_rng_from_uuid(Uuid::new_v4()),
    }
}
