#![cfg(test)]

// Property tests for Table kept inside the crate so they can call the
// structural invariant checker.

use crate::config::TableConfig;
use crate::error::PutError;
use crate::hash::Fnv1aBuildHasher;
use crate::table::Table;
use core::hash::{BuildHasher, Hasher};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, String),
    Delete(usize),
    Find(usize),
    Exists(String),
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            3 => (idx.clone(), "[a-z0-9]{0,6}").prop_map(|(i, v)| OpI::Put(i, v)),
            1 => idx.clone().prop_map(OpI::Delete),
            1 => idx.clone().prop_map(OpI::Find),
            1 => "[a-z]{0,5}".prop_map(OpI::Exists),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Property: state-machine equivalence against std::collections::HashMap.
// Checked after every op:
// - duplicate keys are rejected and leave the old value in place;
// - find/exists parity with the model, including after deletes;
// - len parity; capacity a power of two; probe bound never decreases;
// - every stored key is reachable within the probe bound at its cached position.
fn run_state_machine<S: BuildHasher>(
    mut sut: Table<S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<String, String> = HashMap::new();
    let mut last_bound = sut.probe_bound();

    for op in ops {
        match op {
            OpI::Put(i, v) => {
                let k = &pool[i];
                let already = model.contains_key(k);
                match sut.put(k, &v) {
                    Ok(()) => {
                        prop_assert!(!already, "put must fail on duplicate");
                        model.insert(k.clone(), v);
                    }
                    Err(PutError::KeyExists) => {
                        prop_assert!(already, "duplicate error only when key exists");
                        prop_assert_eq!(sut.find(k), model.get(k).map(String::as_str));
                    }
                    Err(e) => prop_assert!(false, "unexpected error {}", e),
                }
            }
            OpI::Delete(i) => {
                let k = &pool[i];
                let removed = sut.delete(k).map(|(_, v)| v);
                prop_assert_eq!(removed, model.remove(k));
                prop_assert!(!sut.exists(k));
            }
            OpI::Find(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.find(k), model.get(k).map(String::as_str));
            }
            OpI::Exists(s) => {
                prop_assert_eq!(sut.exists(&s), model.contains_key(&s));
            }
            OpI::Iterate => {
                let s: BTreeMap<_, _> = sut.iter().collect();
                let m: BTreeMap<_, _> = model
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                prop_assert_eq!(s, m);
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.capacity().is_power_of_two());
        prop_assert!(sut.probe_bound() >= last_bound, "probe bound decreased");
        last_bound = sut.probe_bound();
        sut.assert_invariants();
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario(), cap in 0usize..16) {
        let sut = Table::new(cap).unwrap();
        run_state_machine(sut, &pool, ops)?;
    }
}

// Collision variant: hash only the first byte, so keys sharing a first
// letter share a probe chain and deletes punch holes inside chains.
#[derive(Clone, Default)]
struct FirstByteBuildHasher;
struct FirstByteHasher(u64);
impl BuildHasher for FirstByteBuildHasher {
    type Hasher = FirstByteHasher;
    fn build_hasher(&self) -> Self::Hasher {
        FirstByteHasher(0)
    }
}
impl Hasher for FirstByteHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.0 = bytes.first().copied().unwrap_or(0) as u64;
    }
    fn finish(&self) -> u64 {
        self.0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let config = TableConfig::default().with_initial_capacity(2);
        let sut = Table::with_config_and_hasher(config, FirstByteBuildHasher).unwrap();
        run_state_machine(sut, &pool, ops)?;
    }
}

// Property: decode(encode(t)) is bucket-for-bucket identical to t, for tables
// shaped by arbitrary put/delete histories, and the restored table keeps
// accepting inserts.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_snapshot_round_trip(
        entries in proptest::collection::btree_map("[ -~]{0,12}", "[ -~]{0,12}", 0..80),
        deletes in proptest::collection::vec(any::<prop::sample::Index>(), 0..20),
        cap in 0usize..64,
    ) {
        let mut t = Table::new(cap).unwrap();
        for (k, v) in &entries {
            t.put(k, v).unwrap();
        }
        let keys: Vec<&String> = entries.keys().collect();
        let mut gone = BTreeSet::new();
        if !keys.is_empty() {
            for d in &deletes {
                let k = keys[d.index(keys.len())];
                t.delete(k);
                gone.insert(k.clone());
            }
        }

        let mut buf = Vec::new();
        let n = t.encode(&mut buf).unwrap();
        prop_assert_eq!(n as usize, buf.len());
        let mut back = Table::decode_with(&mut buf.as_slice(), TableConfig::default(), Fnv1aBuildHasher).unwrap();

        prop_assert_eq!(back.capacity(), t.capacity());
        prop_assert_eq!(back.len(), t.len());
        prop_assert_eq!(back.probe_bound(), t.probe_bound());
        prop_assert!(back.slots().eq(t.slots()));
        for (k, v) in &entries {
            let expected = if gone.contains(k) { None } else { Some(v.as_str()) };
            prop_assert_eq!(back.find(k), expected);
        }
        back.assert_invariants();

        back.put("\u{0}fresh", "v").unwrap();
        prop_assert_eq!(back.find("\u{0}fresh"), Some("v"));
        back.assert_invariants();
    }
}
