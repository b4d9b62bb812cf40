// crates/rotation-gate-core/src/runtime/secret.rs
// ============================================================================
// Module: Rotation Gate Secret Generation
// Description: Random secret generation from a rotation policy.
// Purpose: Produce replacement secrets that satisfy the policy's classes.
// Dependencies: crate::core, rand
// ============================================================================

//! ## Overview
//! Secrets are drawn from the operating system RNG. One character is drawn
//! from each required class, the remainder from the union of all classes, and
//! the result is shuffled so class positions are not predictable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::rngs::OsRng;
use rand::seq::SliceRandom;

use crate::core::CharacterClass;
use crate::core::RotationPolicy;
use crate::core::RotationPolicyError;
use crate::core::SecretValue;

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Generates a secret satisfying `policy`.
///
/// # Errors
///
/// Returns [`RotationPolicyError`] when the policy is invalid.
pub fn generate_secret(policy: &RotationPolicy) -> Result<SecretValue, RotationPolicyError> {
    policy.validate()?;
    let mut classes: Vec<CharacterClass> = Vec::with_capacity(policy.character_classes.len());
    for class in &policy.character_classes {
        if !classes.contains(class) {
            classes.push(*class);
        }
    }
    let union: Vec<u8> =
        classes.iter().flat_map(|class| class.alphabet().iter().copied()).collect();

    let mut rng = OsRng;
    let mut bytes: Vec<u8> = Vec::with_capacity(policy.length);
    for class in &classes {
        if let Some(byte) = class.alphabet().choose(&mut rng) {
            bytes.push(*byte);
        }
    }
    while bytes.len() < policy.length {
        match union.choose(&mut rng) {
            Some(byte) => bytes.push(*byte),
            None => return Err(RotationPolicyError::NoCharacterClasses),
        }
    }
    bytes.shuffle(&mut rng);
    Ok(SecretValue::new(bytes.into_iter().map(char::from).collect::<String>()))
}
