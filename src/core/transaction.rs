// Transactions move value under the UTXO model: each input consumes one
// earlier output, each output locks a value to a pub key hash. Ownership is
// never stored on-chain beyond that 20-byte hash.

use crate::storage::UTXOSet;
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize, sha256_digest};
use crate::wallet::{address_to_pub_key_hash, hash_pub_key, Wallet};
use data_encoding::HEXLOWER;
use log::info;
use std::fmt;
use uuid::Uuid;

/// Value minted by every coinbase transaction
pub const SUBSIDY: u64 = 100;

/// Output index carried by the single input of a coinbase transaction
pub const COINBASE_OUT_INDEX: i64 = -1;

// A transaction input points at output `vout` of transaction `txid`
#[derive(Debug, Clone, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct TXInput {
    txid: Vec<u8>,
    vout: i64,
    signature: Vec<u8>, // r || s
    pub_key: Vec<u8>,   // X || Y, or free-form data on a coinbase input
}

impl TXInput {
    pub fn new(txid: &[u8], vout: i64) -> TXInput {
        TXInput {
            txid: txid.to_vec(),
            vout,
            signature: vec![],
            pub_key: vec![],
        }
    }

    pub fn with_pub_key(txid: &[u8], vout: i64, pub_key: &[u8]) -> TXInput {
        TXInput {
            pub_key: pub_key.to_vec(),
            ..TXInput::new(txid, vout)
        }
    }

    pub fn get_txid(&self) -> &[u8] {
        self.txid.as_slice()
    }

    pub fn get_vout(&self) -> i64 {
        self.vout
    }

    /// `vout` as an index, `None` for the coinbase sentinel
    pub fn output_index(&self) -> Option<usize> {
        usize::try_from(self.vout).ok()
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn get_pub_key(&self) -> &[u8] {
        self.pub_key.as_slice()
    }

    pub(crate) fn set_signature(&mut self, signature: Vec<u8>) {
        self.signature = signature;
    }

    pub(crate) fn set_pub_key(&mut self, pub_key: Vec<u8>) {
        self.pub_key = pub_key;
    }

    /// True when the public key carried by this input hashes to `pub_key_hash`
    pub fn uses_key(&self, pub_key_hash: &[u8]) -> bool {
        let locking_hash = hash_pub_key(self.pub_key.as_slice());
        locking_hash.eq(pub_key_hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct TXOutput {
    value: u64,
    pub_key_hash: Vec<u8>,
}

impl TXOutput {
    /// Create an output paying `value` to `address`
    pub fn new(value: u64, address: &str) -> Result<TXOutput> {
        let mut output = TXOutput {
            value,
            pub_key_hash: vec![],
        };
        output.lock(address)?;
        Ok(output)
    }

    pub fn with_pub_key_hash(value: u64, pub_key_hash: &[u8]) -> TXOutput {
        TXOutput {
            value,
            pub_key_hash: pub_key_hash.to_vec(),
        }
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_pub_key_hash(&self) -> &[u8] {
        self.pub_key_hash.as_slice()
    }

    fn lock(&mut self, address: &str) -> Result<()> {
        self.pub_key_hash = address_to_pub_key_hash(address)?;
        Ok(())
    }

    pub fn is_locked_with_key(&self, pub_key_hash: &[u8]) -> bool {
        self.pub_key_hash.eq(pub_key_hash)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    id: Vec<u8>,
    vin: Vec<TXInput>,
    vout: Vec<TXOutput>,
}

impl Transaction {
    /// Assemble a transaction and compute its id. Inputs are left unsigned.
    pub fn new(vin: Vec<TXInput>, vout: Vec<TXOutput>) -> Result<Transaction> {
        let mut tx = Transaction {
            id: vec![],
            vin,
            vout,
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    pub fn new_coinbase_tx(to: &str, data: &str) -> Result<Transaction> {
        Self::new_coinbase_tx_with_reward(to, data, SUBSIDY)
    }

    /// Mint `reward` to `to`. An empty `data` gets a random suffix so two
    /// coinbases to the same address never share an id.
    pub fn new_coinbase_tx_with_reward(to: &str, data: &str, reward: u64) -> Result<Transaction> {
        let data = if data.is_empty() {
            format!("Coins to {to} ({})", Uuid::new_v4())
        } else {
            data.to_string()
        };

        let txout = TXOutput::new(reward, to)?;
        let tx_input = TXInput::with_pub_key(&[], COINBASE_OUT_INDEX, data.as_bytes());
        Self::new(vec![tx_input], vec![txout])
    }

    /// Build and sign a payment of `amount` from `wallet` to `to`.
    ///
    /// Spendable outputs are selected greedily; whatever exceeds `amount`
    /// comes back to the sender as a change output.
    pub fn new_utxo_transaction(
        wallet: &Wallet,
        to: &str,
        amount: u64,
        utxo_set: &UTXOSet,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(BlockchainError::InvalidTransaction(
                "Amount must be positive".to_string(),
            ));
        }
        let recipient = TXOutput::new(amount, to)?;

        let from = wallet.get_address();
        let public_key_hash = hash_pub_key(wallet.get_public_key());
        let (accumulated, valid_outputs) =
            utxo_set.find_spendable_outputs(public_key_hash.as_slice(), amount)?;

        if accumulated < amount {
            return Err(BlockchainError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let mut inputs = vec![];
        for (txid, outs) in valid_outputs {
            for out in outs {
                let vout = i64::try_from(out).map_err(|_| {
                    BlockchainError::InvalidTransaction(format!("Output index {out} overflows"))
                })?;
                inputs.push(TXInput::with_pub_key(
                    txid.as_slice(),
                    vout,
                    wallet.get_public_key(),
                ));
            }
        }

        let mut outputs = vec![recipient];
        if accumulated > amount {
            outputs.push(TXOutput::with_pub_key_hash(
                accumulated - amount,
                public_key_hash.as_slice(),
            ));
        }

        let mut tx = Transaction::new(inputs, outputs)?;
        utxo_set
            .get_blockchain()
            .sign_transaction(&mut tx, wallet.get_pkcs8())?;

        info!(
            "Built transaction {} sending {amount} from {from} to {to}",
            HEXLOWER.encode(tx.get_id())
        );
        Ok(tx)
    }

    /// Copy with every input's signature and public key cleared
    pub(crate) fn trimmed_copy(&self) -> Transaction {
        let inputs = self
            .vin
            .iter()
            .map(|input| TXInput::new(input.get_txid(), input.get_vout()))
            .collect();
        Transaction {
            id: vec![],
            vin: inputs,
            vout: self.vout.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_id(&self, id: &[u8]) -> Transaction {
        Transaction {
            id: id.to_vec(),
            ..self.clone()
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.vin.len() == 1
            && self.vin[0].txid.is_empty()
            && self.vin[0].vout == COINBASE_OUT_INDEX
    }

    /// SHA-256 of the serialized transaction with `id` cleared
    pub fn hash(&self) -> Result<Vec<u8>> {
        let tx_copy = Transaction {
            id: vec![],
            vin: self.vin.clone(),
            vout: self.vout.clone(),
        };
        Ok(sha256_digest(&tx_copy.serialize()?))
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_vin(&self) -> &[TXInput] {
        self.vin.as_slice()
    }

    pub(crate) fn vin_mut(&mut self) -> &mut [TXInput] {
        self.vin.as_mut_slice()
    }

    pub fn get_vout(&self) -> &[TXOutput] {
        self.vout.as_slice()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Transaction {}:", HEXLOWER.encode(&self.id))?;
        for (i, input) in self.vin.iter().enumerate() {
            writeln!(f, "     Input {i}:")?;
            writeln!(f, "       TXID:      {}", HEXLOWER.encode(&input.txid))?;
            writeln!(f, "       Out:       {}", input.vout)?;
            writeln!(f, "       Signature: {}", HEXLOWER.encode(&input.signature))?;
            writeln!(f, "       PubKey:    {}", HEXLOWER.encode(&input.pub_key))?;
        }
        for (i, output) in self.vout.iter().enumerate() {
            writeln!(f, "     Output {i}:")?;
            writeln!(f, "       Value:  {}", output.value)?;
            writeln!(f, "       Script: {}", HEXLOWER.encode(&output.pub_key_hash))?;
        }
        Ok(())
    }
}
