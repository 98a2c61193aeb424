//! Ledger integration tests
//!
//! End-to-end flows through the public API: keyring, chain creation,
//! payments, balance queries and reopening a chain from disk.

use tally_chain::core::{Blockchain, ProofOfWork, TXInput, TXOutput, Transaction};
use tally_chain::error::{BlockchainError, ErrorKind};
use tally_chain::storage::{UTXOSet, TIP_BLOCK_HASH_KEY};
use tally_chain::wallet::{address_to_pub_key_hash, Wallets};
use tally_chain::MiningSettings;
use tempfile::tempdir;

fn get_balance(utxo_set: &UTXOSet, address: &str) -> u64 {
    let pub_key_hash = address_to_pub_key_hash(address).unwrap();
    utxo_set.get_balance(&pub_key_hash).unwrap()
}

#[test]
fn test_send_moves_value_and_consumes_output() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("blocks");

    let mut wallets = Wallets::load(temp_dir.path().join("wallet.dat")).unwrap();
    let alice = wallets.create_wallet().unwrap();
    let bob = wallets.create_wallet().unwrap();

    let blockchain = Blockchain::create_blockchain_with_path(&alice, &db_path).unwrap();
    let utxo_set = UTXOSet::new(blockchain.clone());
    assert_eq!(get_balance(&utxo_set, &alice), 100);
    let genesis_tx = blockchain.blocks().unwrap()[0].get_transactions()[0].clone();

    let tx = Transaction::new_utxo_transaction(
        wallets.get_wallet(&alice).unwrap(),
        &bob,
        30,
        &utxo_set,
    )
    .unwrap();
    assert!(blockchain.verify_transaction(&tx).unwrap());
    let block = blockchain.mine_block(&[tx]).unwrap();
    assert!(ProofOfWork::validate(&block));

    assert_eq!(get_balance(&utxo_set, &alice), 70);
    assert_eq!(get_balance(&utxo_set, &bob), 30);

    // the genesis output is gone from alice's unspent set
    let alice_hash = address_to_pub_key_hash(&alice).unwrap();
    let unspent = utxo_set.find_unspent_transactions(&alice_hash).unwrap();
    assert!(unspent.iter().all(|tx| tx.get_id() != genesis_tx.get_id()));
}

#[test]
fn test_insufficient_funds() {
    let temp_dir = tempdir().unwrap();
    let mut wallets = Wallets::load(temp_dir.path().join("wallet.dat")).unwrap();
    let alice = wallets.create_wallet().unwrap();
    let bob = wallets.create_wallet().unwrap();

    let blockchain =
        Blockchain::create_blockchain_with_path(&alice, &temp_dir.path().join("blocks")).unwrap();
    let utxo_set = UTXOSet::new(blockchain);

    let result = Transaction::new_utxo_transaction(
        wallets.get_wallet(&alice).unwrap(),
        &bob,
        101,
        &utxo_set,
    );
    match result {
        Err(BlockchainError::InsufficientFunds {
            required,
            available,
        }) => {
            assert_eq!(required, 101);
            assert_eq!(available, 100);
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }

    // bob owns nothing at all
    let result = Transaction::new_utxo_transaction(
        wallets.get_wallet(&bob).unwrap(),
        &alice,
        1,
        &utxo_set,
    );
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn test_exact_amount_has_no_change_output() {
    let temp_dir = tempdir().unwrap();
    let mut wallets = Wallets::load(temp_dir.path().join("wallet.dat")).unwrap();
    let alice = wallets.create_wallet().unwrap();
    let bob = wallets.create_wallet().unwrap();

    let blockchain =
        Blockchain::create_blockchain_with_path(&alice, &temp_dir.path().join("blocks")).unwrap();
    let utxo_set = UTXOSet::new(blockchain.clone());

    let tx = Transaction::new_utxo_transaction(
        wallets.get_wallet(&alice).unwrap(),
        &bob,
        100,
        &utxo_set,
    )
    .unwrap();
    assert_eq!(tx.get_vout().len(), 1);
    blockchain.mine_block(&[tx]).unwrap();

    assert_eq!(get_balance(&utxo_set, &alice), 0);
    assert_eq!(get_balance(&utxo_set, &bob), 100);
}

#[test]
fn test_double_spend_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let mut wallets = Wallets::load(temp_dir.path().join("wallet.dat")).unwrap();
    let alice = wallets.create_wallet().unwrap();
    let bob = wallets.create_wallet().unwrap();
    let carol = wallets.create_wallet().unwrap();

    let blockchain =
        Blockchain::create_blockchain_with_path(&alice, &temp_dir.path().join("blocks")).unwrap();
    let utxo_set = UTXOSet::new(blockchain.clone());
    let alice_wallet = wallets.get_wallet(&alice).unwrap();

    // both spend the genesis output
    let to_bob = Transaction::new_utxo_transaction(alice_wallet, &bob, 40, &utxo_set).unwrap();
    let to_carol = Transaction::new_utxo_transaction(alice_wallet, &carol, 40, &utxo_set).unwrap();

    // within a single block
    let err = blockchain
        .mine_block(&[to_bob.clone(), to_carol.clone()])
        .unwrap_err();
    assert!(matches!(err, BlockchainError::InvalidTransaction(_)));

    // across blocks
    blockchain.mine_block(&[to_bob]).unwrap();
    let tip = blockchain.get_tip_hash().unwrap();
    let err = blockchain.mine_block(&[to_carol]).unwrap_err();
    assert!(matches!(err, BlockchainError::InvalidTransaction(_)));
    assert_eq!(blockchain.get_tip_hash().unwrap(), tip);

    assert_eq!(get_balance(&utxo_set, &alice), 60);
    assert_eq!(get_balance(&utxo_set, &bob), 40);
    assert_eq!(get_balance(&utxo_set, &carol), 0);
}

#[test]
fn test_signing_with_unknown_prior_transaction() {
    let temp_dir = tempdir().unwrap();
    let mut wallets = Wallets::load(temp_dir.path().join("wallet.dat")).unwrap();
    let alice = wallets.create_wallet().unwrap();
    let wallet = wallets.get_wallet(&alice).unwrap();

    let blockchain =
        Blockchain::create_blockchain_with_path(&alice, &temp_dir.path().join("blocks")).unwrap();

    let mut tx = Transaction::new(
        vec![TXInput::with_pub_key(&[0x42; 32], 0, wallet.get_public_key())],
        vec![TXOutput::new(10, &alice).unwrap()],
    )
    .unwrap();
    let err = blockchain
        .sign_transaction(&mut tx, wallet.get_pkcs8())
        .unwrap_err();
    assert!(matches!(err, BlockchainError::TransactionNotFound(_)));
    assert!(tx.get_vin()[0].get_signature().is_empty());
}

#[test]
fn test_chain_survives_reopen() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("blocks");
    let wallet_path = temp_dir.path().join("wallet.dat");

    let (alice, bob) = {
        let mut wallets = Wallets::load(&wallet_path).unwrap();
        (wallets.create_wallet().unwrap(), wallets.create_wallet().unwrap())
    };

    let tip = {
        let wallets = Wallets::load(&wallet_path).unwrap();
        let blockchain = Blockchain::create_blockchain_with_path(&alice, &db_path).unwrap();
        let utxo_set = UTXOSet::new(blockchain.clone());
        let tx = Transaction::new_utxo_transaction(
            wallets.get_wallet(&alice).unwrap(),
            &bob,
            25,
            &utxo_set,
        )
        .unwrap();
        blockchain.mine_block(&[tx]).unwrap();
        blockchain.get_tip_hash().unwrap()
    };

    let blockchain = Blockchain::open_blockchain_with_path(&db_path).unwrap();
    assert_eq!(blockchain.get_tip_hash().unwrap(), tip);
    let blocks = blockchain.blocks().unwrap();
    assert_eq!(blocks.len(), 2);
    assert!(blocks.iter().all(ProofOfWork::validate));

    let utxo_set = UTXOSet::new(blockchain.clone());
    assert_eq!(get_balance(&utxo_set, &alice), 75);
    assert_eq!(get_balance(&utxo_set, &bob), 25);

    // keep going from the reopened chain
    let wallets = Wallets::load(&wallet_path).unwrap();
    let tx = Transaction::new_utxo_transaction(
        wallets.get_wallet(&bob).unwrap(),
        &alice,
        5,
        &utxo_set,
    )
    .unwrap();
    blockchain.mine_block(&[tx]).unwrap();
    assert_eq!(get_balance(&utxo_set, &alice), 80);
    assert_eq!(get_balance(&utxo_set, &bob), 20);
}

#[test]
fn test_parallel_mining_produces_same_nonce_rules() {
    let temp_dir = tempdir().unwrap();
    let mut wallets = Wallets::load(temp_dir.path().join("wallet.dat")).unwrap();
    let alice = wallets.create_wallet().unwrap();

    let mining = MiningSettings {
        workers: 4,
        nonce_budget: i64::MAX,
    };
    let blockchain = Blockchain::create_blockchain_with_mining(
        &alice,
        &temp_dir.path().join("blocks"),
        mining,
    )
    .unwrap();
    let block = blockchain
        .mine_block(&[Transaction::new_coinbase_tx(&alice, "").unwrap()])
        .unwrap();
    assert!(ProofOfWork::validate(&block));
}

#[test]
fn test_dangling_tip_is_reported_as_corruption() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("blocks");
    let mut wallets = Wallets::load(temp_dir.path().join("wallet.dat")).unwrap();
    let alice = wallets.create_wallet().unwrap();

    drop(Blockchain::create_blockchain_with_path(&alice, &db_path).unwrap());

    {
        let db = sled::open(&db_path).unwrap();
        let blocks = db.open_tree("blocks").unwrap();
        blocks.insert(TIP_BLOCK_HASH_KEY, vec![0xEE; 32]).unwrap();
        db.flush().unwrap();
    }

    let blockchain = Blockchain::open_blockchain_with_path(&db_path).unwrap();
    let err = blockchain.blocks().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corruption);
}

#[test]
fn test_concurrent_appends_from_cloned_handles_stay_linked() {
    let temp_dir = tempdir().unwrap();
    let mut wallets = Wallets::load(temp_dir.path().join("wallet.dat")).unwrap();
    let alice = wallets.create_wallet().unwrap();
    let bob = wallets.create_wallet().unwrap();

    let blockchain =
        Blockchain::create_blockchain_with_path(&alice, &temp_dir.path().join("blocks")).unwrap();
    let genesis_hash = blockchain.get_tip_hash().unwrap();

    let mined: Vec<Vec<u8>> = std::thread::scope(|scope| {
        let handles: Vec<_> = [&alice, &bob]
            .into_iter()
            .map(|address| {
                let chain = blockchain.clone();
                scope.spawn(move || {
                    let coinbase = Transaction::new_coinbase_tx(address, "").unwrap();
                    chain.mine_block(&[coinbase]).unwrap().get_hash().to_vec()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let blocks = blockchain.blocks().unwrap();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[0].get_pre_block_hash(), blocks[1].get_hash());
    assert_eq!(blocks[1].get_pre_block_hash(), blocks[2].get_hash());
    assert_eq!(blocks[2].get_hash(), genesis_hash.as_slice());
    assert_eq!(blockchain.get_tip_hash().unwrap(), blocks[0].get_hash());
    let appended = [blocks[0].get_hash(), blocks[1].get_hash()];
    assert!(mined.iter().all(|hash| appended.contains(&hash.as_slice())));

    let utxo_set = UTXOSet::new(blockchain);
    assert_eq!(get_balance(&utxo_set, &alice), 200);
    assert_eq!(get_balance(&utxo_set, &bob), 100);
}
