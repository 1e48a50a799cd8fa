use std::hash::Hasher;
use std::iter::FromIterator;

use merkletree::hash::Algorithm;
use merkletree::merkle;
use merkletree::merkle::VecStore;
use merkletree::proof::Proof;
use tiny_keccak::{Hasher as KeccakHasher, Keccak};

/// `merkletree::hash::Algorithm` adapter around Keccak256, matching the
/// on-chain/JS Merkle implementation: internal nodes are `keccak256(sorted(left, right))`
/// (lexicographic, not positional — spec.md §4.3's "byte-identical on both
/// sides" requirement depends on this exact ordering rule).
#[derive(Clone)]
struct KeccakAlgorithm(Keccak);

impl KeccakAlgorithm {
    fn new() -> KeccakAlgorithm {
        KeccakAlgorithm(Keccak::v256())
    }
}

impl Default for KeccakAlgorithm {
    fn default() -> KeccakAlgorithm {
        KeccakAlgorithm::new()
    }
}

impl Hasher for KeccakAlgorithm {
    #[inline]
    fn write(&mut self, msg: &[u8]) {
        self.0.update(msg)
    }

    #[inline]
    fn finish(&self) -> u64 {
        unimplemented!("merkletree::Algorithm uses hash(), not Hasher::finish")
    }
}

type MerkleItem = [u8; 32];

impl Algorithm<MerkleItem> for KeccakAlgorithm {
    #[inline]
    fn hash(&mut self) -> MerkleItem {
        let mut res: MerkleItem = [0; 32];
        self.0.clone().finalize(&mut res);
        res
    }

    #[inline]
    fn reset(&mut self) {
        self.0 = Keccak::v256()
    }

    fn leaf(&mut self, leaf: MerkleItem) -> MerkleItem {
        leaf
    }

    fn node(&mut self, left: MerkleItem, right: MerkleItem, _height: usize) -> MerkleItem {
        let mut node_vec = vec![left.to_vec(), right.to_vec()];
        node_vec.sort();

        let flattened: Vec<u8> = node_vec.into_iter().flatten().collect();

        self.write(&flattened);
        self.hash()
    }
}

type ExternalMerkleTree =
    merkletree::merkle::MerkleTree<MerkleItem, KeccakAlgorithm, VecStore<MerkleItem>>;

#[derive(Clone)]
enum Tree {
    SingleItem(MerkleItem),
    MerkleTree(ExternalMerkleTree),
}

/// A Keccak256 Merkle tree over 32-byte leaves, sorted and deduplicated
/// before being committed. Used both for the balances state root and for
/// the heartbeat's single-leaf commitment (spec.md §4.3, §4.8).
pub struct MerkleTree {
    tree: Tree,
    root: MerkleItem,
}

impl MerkleTree {
    pub fn new(data: &[MerkleItem]) -> MerkleTree {
        let mut leaves: Vec<MerkleItem> = data.to_owned();

        let tree: Tree = if leaves.len() == 1 {
            Tree::SingleItem(*leaves.first().unwrap())
        } else {
            leaves.sort();
            leaves.dedup();

            let merkle_tree = merkle::MerkleTree::from_iter(leaves);
            Tree::MerkleTree(merkle_tree)
        };

        let root: MerkleItem = match &tree {
            Tree::SingleItem(root) => *root,
            Tree::MerkleTree(merkle_tree) => merkle_tree.root(),
        };

        MerkleTree { tree, root }
    }

    pub fn root(&self) -> MerkleItem {
        self.root
    }

    pub fn verify(&self, proof: (Vec<MerkleItem>, Vec<bool>)) -> bool {
        let proof = Proof::new(proof.0, proof.1);
        proof.validate::<KeccakAlgorithm>()
    }

    pub fn proof(&self, i: usize) -> (Vec<MerkleItem>, Vec<bool>) {
        match &self.tree {
            Tree::SingleItem(_) => (vec![], vec![]),
            Tree::MerkleTree(merkle_tree) => {
                let proof = merkle_tree.gen_proof(i);
                (proof.lemma().to_owned(), proof.path().to_owned())
            }
        }
    }
}
