//! Shared helpers for the integration test suite: gate composition on
//! top of `Network`'s native 2-input And, and a brute-force truth-table
//! evaluator used in place of an external equivalence checker (per
//! SPEC_FULL.md §8 scenario 4: "since no external `abc` is assumed
//! present").
#![allow(dead_code)]

use rrr::network::Network;

pub type Signal = (usize, bool);

pub fn not_sig(s: Signal) -> Signal {
    (s.0, !s.1)
}

pub fn and_gate(net: &mut Network, a: Signal, b: Signal) -> Signal {
    (net.add_and(vec![a, b]), false)
}

pub fn or_gate(net: &mut Network, a: Signal, b: Signal) -> Signal {
    not_sig(and_gate(net, not_sig(a), not_sig(b)))
}

pub fn xor_gate(net: &mut Network, a: Signal, b: Signal) -> Signal {
    let t1 = and_gate(net, a, not_sig(b));
    let t2 = and_gate(net, not_sig(a), b);
    or_gate(net, t1, t2)
}

pub fn half_adder(net: &mut Network, a: Signal, b: Signal) -> (Signal, Signal) {
    (xor_gate(net, a, b), and_gate(net, a, b))
}

pub fn full_adder(net: &mut Network, a: Signal, b: Signal, cin: Signal) -> (Signal, Signal) {
    let (s1, c1) = half_adder(net, a, b);
    let (s2, c2) = half_adder(net, s1, cin);
    (s2, or_gate(net, c1, c2))
}

/// Brute-force truth table: one row per PI assignment, in `net.pis()`
/// order, one column per PO in `net.pos()` order.
pub fn simulate(net: &Network, inputs: &[bool]) -> Vec<bool> {
    let mut vals = vec![false; net.capacity()];
    for (i, &pi) in net.pis().iter().enumerate() {
        vals[pi] = inputs[i];
    }
    net.for_each_int(|id| {
        if net.is_and(id) {
            let mut v = true;
            for &(fi, c) in net.fanins(id) {
                v &= vals[fi] ^ c;
            }
            vals[id] = v;
        }
    });
    net.po_drivers().iter().map(|&(src, c)| vals[src] ^ c).collect()
}

pub fn truth_table(net: &Network) -> Vec<Vec<bool>> {
    let n = net.num_pis();
    (0..1usize << n)
        .map(|mask| {
            let inputs: Vec<bool> = (0..n).map(|i| (mask >> i) & 1 == 1).collect();
            simulate(net, &inputs)
        })
        .collect()
}

/// Builds a small layered AIG from a flat gene list: each gene picks two
/// parents from the pool-so-far (PIs plus every And built so far, index
/// taken mod the current pool size so any `u8` is a valid gene) and
/// their edge polarities. The last And built drives the network's only
/// PO. Used by the property tests to explore random small networks
/// without needing a parsed-fixture file.
pub fn build_from_genes(num_pis: usize, genes: &[(u8, u8, bool, bool)]) -> Network {
    let mut net = Network::new();
    let mut pool: Vec<usize> = (0..num_pis).map(|_| net.add_pi()).collect();
    for &(gi, gj, ci, cj) in genes {
        let i = pool[gi as usize % pool.len()];
        let j = pool[gj as usize % pool.len()];
        let id = net.add_and(vec![(i, ci), (j, cj)]);
        pool.push(id);
    }
    let out = *pool.last().unwrap();
    net.add_po(out, false);
    net
}
