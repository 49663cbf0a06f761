//! Finite fields and the Reed-Solomon codec shared by the 2-D symbologies

pub mod field;
pub mod galois;
pub mod modulus;
pub mod reed_solomon;

pub use field::Field;
pub use galois::{
    AZTEC_DATA_6, AZTEC_DATA_10, AZTEC_DATA_12, AZTEC_PARAM, DATA_MATRIX_FIELD_256, GaloisField,
    Gf256, QR_CODE_FIELD_256,
};
pub use modulus::{PDF417_FIELD, PrimeField};
pub use reed_solomon::ReedSolomon;
