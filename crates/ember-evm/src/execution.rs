//! Call and create orchestration
//!
//! Every CALL, CALLCODE, DELEGATECALL and CREATE, nested or top-level,
//! goes through [`Evm`]. It checks depth and balance, snapshots state,
//! moves value, runs the interpreter or a native contract, charges the
//! code deposit for creations and reverts everything the frame did if it
//! fails. A frame that calls out suspends with a [`CallRequest`]; the
//! callee runs on an explicit frame stack and its result is handed back
//! when it finishes, so call depth costs heap, not native stack.

use std::sync::Arc;

use bytes::Bytes;
use ember_crypto::{create_address, keccak256};
use ember_primitives::{Address, H256};
use ember_state::{SnapshotId, State};
use ember_types::Log;
use primitive_types::U256;
use tracing::{debug, trace};

use crate::analysis::Destinations;
use crate::context::{BlockContext, CallFrame, Environment};
use crate::error::{EvmError, EvmResult};
use crate::gas::{code_deposit_gas, cost::MAX_CALL_DEPTH};
use crate::gas_table::{GasTable, RuleSet};
use crate::interpreter::{Exit, Interpreter};
use crate::jump_table::JumpTable;
use crate::precompiles::PrecompileRegistry;

/// Entry point into the orchestrator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// Run the callee's code against the callee's account
    Call,
    /// Run the callee's code against the caller's account
    CallCode,
    /// Like CALLCODE, also keeping the parent's caller and value
    DelegateCall,
    /// Run init code and store what it returns as a new contract
    Create,
}

/// Outcome of one call or create
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallResult {
    /// Return data, or the deployed code for a create
    pub output: Bytes,
    /// Gas handed back to the caller
    pub gas_left: u64,
    /// Address of the contract a create made
    pub created: Option<Address>,
    /// Why the frame failed
    pub error: Option<EvmError>,
}

impl CallResult {
    fn success(output: Bytes, gas_left: u64) -> Self {
        Self {
            output,
            gas_left,
            created: None,
            error: None,
        }
    }

    fn failed(error: EvmError, gas_left: u64) -> Self {
        Self {
            output: Bytes::new(),
            gas_left,
            created: None,
            error: Some(error),
        }
    }

    /// Whether the frame completed
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A call or create a running frame asked for. The interpreter suspends
/// with it and [`Evm`] runs the callee on its own frame stack.
#[derive(Clone, Debug)]
pub struct CallRequest {
    kind: CallKind,
    /// Account paying `value`
    caller: Address,
    /// Caller seen by the new frame
    frame_caller: Address,
    /// Account the frame acts on; `None` until a create derives it
    address: Option<Address>,
    code_address: Option<Address>,
    code: Bytes,
    code_hash: H256,
    input: Bytes,
    gas: u64,
    value: U256,
}

impl CallRequest {
    /// Entry point used
    pub fn kind(&self) -> CallKind {
        self.kind
    }

    /// Account making the request
    pub fn caller(&self) -> Address {
        self.caller
    }

    /// Account whose code runs; `None` for a create
    pub fn target(&self) -> Option<Address> {
        self.code_address
    }

    /// Call data, or the init code of a create
    pub fn data(&self) -> &Bytes {
        match self.kind {
            CallKind::Create => &self.code,
            _ => &self.input,
        }
    }

    /// Gas handed to the callee, stipend included
    pub fn gas(&self) -> u64 {
        self.gas
    }

    /// Value moved to the callee
    pub fn value(&self) -> U256 {
        self.value
    }
}

/// What reverting or committing a frame needs
struct Checkpoint {
    kind: CallKind,
    address: Address,
    snapshot: SnapshotId,
    log_mark: usize,
}

/// A frame whose code is running
struct Frame {
    checkpoint: Checkpoint,
    interpreter: Box<Interpreter>,
}

enum Entry {
    /// Finished without running code
    Done(CallResult),
    Running(Frame),
}

/// Execution engine for one transaction
pub struct Evm<'a> {
    pub(crate) state: &'a mut dyn State,
    pub(crate) env: Environment,
    pub(crate) gas_table: GasTable,
    pub(crate) jump_table: JumpTable,
    pub(crate) destinations: Arc<Destinations>,
    pub(crate) logs: Vec<Log>,
    precompiles: &'a PrecompileRegistry,
    homestead: bool,
    atlantis: bool,
    depth: usize,
}

impl<'a> Evm<'a> {
    /// Create an engine for a transaction in `env.block`, with the rule
    /// set resolved once for that block
    pub fn new(
        state: &'a mut dyn State,
        env: Environment,
        rules: &dyn RuleSet,
        precompiles: &'a PrecompileRegistry,
    ) -> Self {
        let block = env.block.number;
        let homestead = rules.is_homestead(block);
        Self {
            state,
            gas_table: rules.gas_table(block),
            jump_table: JumpTable::new(homestead),
            destinations: Arc::new(Destinations::new()),
            logs: Vec::new(),
            env,
            precompiles,
            homestead,
            atlantis: rules.is_atlantis(block),
            depth: 0,
        }
    }

    /// Share a jump analysis cache with other executions
    pub fn with_destinations(mut self, destinations: Arc<Destinations>) -> Self {
        self.destinations = destinations;
        self
    }

    /// State being executed against
    pub fn state(&self) -> &dyn State {
        &*self.state
    }

    /// Mutable access to the state
    pub fn state_mut(&mut self) -> &mut dyn State {
        &mut *self.state
    }

    /// Block being executed in
    pub fn block(&self) -> &BlockContext {
        &self.env.block
    }

    /// Gas table in force
    pub fn gas_table(&self) -> &GasTable {
        &self.gas_table
    }

    /// Whether Homestead rules apply
    pub fn is_homestead(&self) -> bool {
        self.homestead
    }

    /// Whether Atlantis rules apply
    pub fn is_atlantis(&self) -> bool {
        self.atlantis
    }

    /// Number of frames currently running
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Logs emitted by frames that completed so far
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Take the collected logs
    pub fn take_logs(&mut self) -> Vec<Log> {
        std::mem::take(&mut self.logs)
    }

    /// Message call: run `to`'s code against `to`'s account
    pub fn call(&mut self, caller: Address, to: Address, input: Bytes, gas: u64, value: U256) -> CallResult {
        let request = self.call_request(caller, to, input, gas, value);
        self.exec(request)
    }

    /// Run `to`'s code against the caller's own account
    pub fn call_code(&mut self, caller: Address, to: Address, input: Bytes, gas: u64, value: U256) -> CallResult {
        let request = self.call_code_request(caller, to, input, gas, value);
        self.exec(request)
    }

    /// Run `to`'s code in `parent`'s context, keeping its caller and value.
    /// Nothing is transferred.
    pub fn delegate_call(&mut self, parent: &CallFrame, to: Address, input: Bytes, gas: u64) -> CallResult {
        let request = self.delegate_call_request(parent, to, input, gas);
        self.exec(request)
    }

    /// Deploy a contract from `init_code`. The address derives from the
    /// caller and its nonce, which is bumped even if the create fails.
    pub fn create(&mut self, caller: Address, init_code: Bytes, gas: u64, value: U256) -> CallResult {
        let request = Self::create_request(caller, init_code, gas, value);
        self.exec(request)
    }

    pub(crate) fn call_request(&self, caller: Address, to: Address, input: Bytes, gas: u64, value: U256) -> CallRequest {
        CallRequest {
            kind: CallKind::Call,
            caller,
            frame_caller: caller,
            address: Some(to),
            code_address: Some(to),
            code: self.state.get_code(&to),
            code_hash: self.state.get_code_hash(&to),
            input,
            gas,
            value,
        }
    }

    pub(crate) fn call_code_request(
        &self,
        caller: Address,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallRequest {
        CallRequest {
            kind: CallKind::CallCode,
            caller,
            frame_caller: caller,
            address: Some(caller),
            code_address: Some(to),
            code: self.state.get_code(&to),
            code_hash: self.state.get_code_hash(&to),
            input,
            gas,
            value,
        }
    }

    pub(crate) fn delegate_call_request(&self, parent: &CallFrame, to: Address, input: Bytes, gas: u64) -> CallRequest {
        CallRequest {
            kind: CallKind::DelegateCall,
            caller: parent.address,
            frame_caller: parent.caller,
            address: Some(parent.address),
            code_address: Some(to),
            code: self.state.get_code(&to),
            code_hash: self.state.get_code_hash(&to),
            input,
            gas,
            value: parent.value,
        }
    }

    pub(crate) fn create_request(caller: Address, init_code: Bytes, gas: u64, value: U256) -> CallRequest {
        CallRequest {
            kind: CallKind::Create,
            caller,
            frame_caller: caller,
            address: None,
            code_address: None,
            code_hash: keccak256(&init_code),
            code: init_code,
            input: Bytes::new(),
            gas,
            value,
        }
    }

    fn exec(&mut self, request: CallRequest) -> CallResult {
        match self.enter(request) {
            Entry::Done(result) => result,
            Entry::Running(mut frame) => {
                let outcome = self.drive(&mut frame.interpreter);
                self.leave(frame, outcome)
            }
        }
    }

    /// Run `root` and every frame it spawns. Callees live on an explicit
    /// frame stack, so nesting depth never grows the native stack.
    pub(crate) fn drive(&mut self, root: &mut Interpreter) -> EvmResult<Bytes> {
        let mut frames: Vec<Frame> = Vec::new();
        loop {
            let running = match frames.last_mut() {
                Some(frame) => &mut *frame.interpreter,
                None => &mut *root,
            };
            let mut result = match running.execute(self) {
                Ok(Exit::Call(request)) => match self.enter(*request) {
                    Entry::Running(frame) => {
                        frames.push(frame);
                        continue;
                    }
                    Entry::Done(result) => result,
                },
                Ok(Exit::Return(output)) => match frames.pop() {
                    Some(frame) => self.leave(frame, Ok(output)),
                    None => return Ok(output),
                },
                Err(error) => match frames.pop() {
                    Some(frame) => self.leave(frame, Err(error)),
                    None => return Err(error),
                },
            };

            // hand the result to the frame waiting on it
            loop {
                let waiting = match frames.last_mut() {
                    Some(frame) => &mut *frame.interpreter,
                    None => &mut *root,
                };
                match waiting.resume(result, self) {
                    Ok(()) => break,
                    Err(error) => match frames.pop() {
                        Some(frame) => result = self.leave(frame, Err(error)),
                        None => return Err(error),
                    },
                }
            }
        }
    }

    /// Depth and balance checks, snapshot and value transfer. Native
    /// contracts and accounts without code finish here; anything else
    /// yields a frame for its code.
    fn enter(&mut self, request: CallRequest) -> Entry {
        let CallRequest {
            kind,
            caller,
            frame_caller,
            address,
            code_address,
            code,
            code_hash,
            input,
            gas,
            value,
        } = request;

        if self.depth > MAX_CALL_DEPTH {
            debug!(depth = self.depth, "max call depth exceeded");
            return Entry::Done(CallResult::failed(EvmError::MaxCallDepthExceeded, gas));
        }
        if kind != CallKind::DelegateCall {
            let available = self.state.get_balance(&caller);
            if available < value {
                debug!(%caller, %value, %available, "insufficient balance for transfer");
                return Entry::Done(CallResult::failed(
                    EvmError::InsufficientBalance {
                        required: value,
                        available,
                    },
                    gas,
                ));
            }
        }

        let address = match address {
            Some(address) => address,
            None => {
                let nonce = self.state.get_nonce(&caller);
                self.state.set_nonce(&caller, nonce + 1);
                create_address(&caller, nonce)
            }
        };

        let checkpoint = Checkpoint {
            kind,
            address,
            snapshot: self.state.snapshot(),
            log_mark: self.logs.len(),
        };

        if kind == CallKind::Create {
            self.state.create_account(address);
            if self.atlantis {
                self.state.set_nonce(&address, 1);
            }
        } else if !self.state.exists(&address) {
            // no empty accounts from plain value-less calls
            if kind != CallKind::DelegateCall
                && self.atlantis
                && value.is_zero()
                && !self.precompiles.contains(&address)
            {
                trace!(%address, "call to missing account skipped");
                return Entry::Done(CallResult::success(Bytes::new(), gas));
            }
            self.state.create_account(address);
        }

        if kind != CallKind::DelegateCall && !value.is_zero() {
            self.state.sub_balance(&caller, value);
            self.state.add_balance(&address, value);
        }

        let precompiles = self.precompiles;
        if let Some(contract) = code_address.as_ref().and_then(|a| precompiles.get(a)) {
            let cost = contract.required_gas(&input);
            let result = if gas < cost {
                self.finish(checkpoint, 0, Err(EvmError::OutOfGas))
            } else {
                self.finish(checkpoint, gas - cost, Ok(contract.run(&input)))
            };
            return Entry::Done(result);
        }
        if code.is_empty() {
            return Entry::Done(self.finish(checkpoint, gas, Ok(Bytes::new())));
        }

        let frame = CallFrame {
            code,
            code_hash,
            code_address,
            input,
            gas,
            gas_price: self.env.gas_price,
            value,
            caller: frame_caller,
            address,
            is_delegate: kind == CallKind::DelegateCall,
            depth: self.depth + 1,
        };
        self.depth += 1;
        Entry::Running(Frame {
            checkpoint,
            interpreter: Box::new(Interpreter::new(frame)),
        })
    }

    fn leave(&mut self, frame: Frame, outcome: EvmResult<Bytes>) -> CallResult {
        self.depth -= 1;
        let gas_left = frame.interpreter.gas_left();
        self.finish(frame.checkpoint, gas_left, outcome)
    }

    /// Charge the code deposit of a create, then commit the frame or
    /// revert everything it did
    fn finish(&mut self, checkpoint: Checkpoint, mut gas_left: u64, mut result: EvmResult<Bytes>) -> CallResult {
        let Checkpoint {
            kind,
            address,
            snapshot,
            log_mark,
        } = checkpoint;

        if kind == CallKind::Create {
            if let Ok(code) = &result {
                let deposit = code_deposit_gas(code.len());
                if gas_left >= deposit {
                    gas_left -= deposit;
                    self.state.set_code(&address, code.clone());
                } else {
                    result = Err(EvmError::CodeStoreOutOfGas);
                }
            }
        }
        let created = (kind == CallKind::Create).then_some(address);

        match result {
            Ok(output) => CallResult {
                output,
                gas_left,
                created,
                error: None,
            },
            // Frontier keeps the account, without code, and the gas
            Err(EvmError::CodeStoreOutOfGas) if !self.homestead => {
                debug!(%address, "code deposit unaffordable, keeping empty contract");
                CallResult {
                    output: Bytes::new(),
                    gas_left,
                    created,
                    error: Some(EvmError::CodeStoreOutOfGas),
                }
            }
            Err(error) => {
                debug!(%address, depth = self.depth + 1, %error, "frame failed, reverting");
                self.state.revert_to_snapshot(snapshot);
                self.logs.truncate(log_mark);
                CallResult {
                    output: Bytes::new(),
                    gas_left: 0,
                    created,
                    error: Some(error),
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }
}

#[cfg(test)]
mod tests {
    use ember_state::MemoryState;
    use proptest::prelude::*;

    use super::*;
    use crate::gas_table::ChainConfig;

    const FRONTIER: u64 = 1;
    const HOMESTEAD: u64 = 2_000_000;
    const ATLANTIS: u64 = 9_000_000;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn origin() -> Address {
        addr(0xaaaa)
    }

    fn env_at(block: u64) -> Environment {
        Environment {
            block: BlockContext {
                number: block,
                ..Default::default()
            },
            origin: origin(),
            gas_price: U256::one(),
        }
    }

    fn funded_state() -> MemoryState {
        let mut state = MemoryState::new();
        state.insert_account(origin(), U256::from(1_000_000), 0, Bytes::new(), []);
        state
    }

    fn deploy(state: &mut MemoryState, address: Address, code: &[u8]) {
        state.insert_account(address, U256::zero(), 0, Bytes::copy_from_slice(code), []);
    }

    fn push20(code: &mut Vec<u8>, address: Address) {
        code.push(0x73);
        code.extend_from_slice(address.as_bytes());
    }

    /// PUSH1 1 PUSH1 0 RETURN: deploys a single zero byte
    const ONE_BYTE_INIT: [u8; 5] = [0x60, 0x01, 0x60, 0x00, 0xf3];

    #[test]
    fn test_call_transfers_value_and_creates_recipient() {
        let mut state = funded_state();
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);

        let result = evm.call(origin(), addr(0xbeef), Bytes::new(), 21_000, U256::from(10));
        assert!(result.is_success());
        assert_eq!(result.gas_left, 21_000);
        assert_eq!(state.get_balance(&addr(0xbeef)), U256::from(10));
        assert_eq!(state.get_balance(&origin()), U256::from(999_990));
    }

    #[test]
    fn test_insufficient_balance_returns_gas() {
        let mut state = funded_state();
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);

        let result = evm.call(origin(), addr(2), Bytes::new(), 5_000, U256::from(2_000_000));
        assert_eq!(result.gas_left, 5_000);
        assert_eq!(
            result.error,
            Some(EvmError::InsufficientBalance {
                required: U256::from(2_000_000),
                available: U256::from(1_000_000),
            })
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut state = funded_state();
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);

        evm.set_depth(1025);
        let result = evm.call(origin(), addr(0xbeef), Bytes::new(), 7_000, U256::from(10));
        assert_eq!(result.error, Some(EvmError::MaxCallDepthExceeded));
        assert_eq!(result.gas_left, 7_000);

        evm.set_depth(1024);
        let result = evm.call(origin(), addr(0xbeef), Bytes::new(), 7_000, U256::zero());
        assert!(result.is_success());
        drop(evm);
        assert_eq!(state.get_balance(&origin()), U256::from(1_000_000));
    }

    /// PUSH1 0 x5 ADDRESS PUSH1 100 GAS SUB CALL STOP: calls itself
    /// with all but 100 of its gas
    const SELF_CALL: [u8; 17] = [
        0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x30, 0x60, 0x64, 0x5a, 0x03, 0xf1,
        0x00,
    ];

    #[test]
    fn test_self_recursion_stops_at_depth_limit() {
        let mut state = funded_state();
        deploy(&mut state, addr(0xc0de), &SELF_CALL);
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);

        let result = evm.call(origin(), addr(0xc0de), Bytes::new(), 10_000_000, U256::zero());
        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(evm.depth(), 0);
        // 1025 frames at 65 gas each; the refused call hands its gas back
        assert_eq!(result.gas_left, 10_000_000 - 1025 * 65);
    }

    #[test]
    fn test_every_nested_frame_runs_up_to_the_limit() {
        // PUSH1 1 PUSH1 0 SLOAD ADD PUSH1 0 SSTORE, then the self call
        let mut code = vec![0x60, 0x01, 0x60, 0x00, 0x54, 0x01, 0x60, 0x00, 0x55];
        code.extend_from_slice(&SELF_CALL);
        let mut state = funded_state();
        deploy(&mut state, addr(0xc0de), &code);
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);

        let result = evm.call(origin(), addr(0xc0de), Bytes::new(), 10_000_000, U256::zero());
        assert!(result.is_success(), "{:?}", result.error);
        drop(evm);
        let count = state.get_storage(&addr(0xc0de), &H256::ZERO).to_word();
        assert_eq!(count, U256::from(MAX_CALL_DEPTH + 1));
    }

    #[test]
    fn test_deep_failure_unwinds_only_the_failing_frame() {
        // counts frames, then the self call, then an invalid opcode once
        // the counter passes 1000: only the innermost frames revert
        // PUSH1 1 PUSH1 0 SLOAD ADD DUP1 PUSH1 0 SSTORE
        let mut code = vec![0x60, 0x01, 0x60, 0x00, 0x54, 0x01, 0x80, 0x60, 0x00, 0x55];
        // PUSH2 1000 LT PUSH1 <dest> JUMPI
        code.extend_from_slice(&[0x61, 0x03, 0xe8, 0x10, 0x60, 0x00, 0x57]);
        code.extend_from_slice(&SELF_CALL[..16]);
        // STOP JUMPDEST INVALID
        code[15] = (code.len() + 1) as u8;
        code.extend_from_slice(&[0x00, 0x5b, 0xfe]);

        let mut state = funded_state();
        deploy(&mut state, addr(0xc0de), &code);
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);

        let result = evm.call(origin(), addr(0xc0de), Bytes::new(), 10_000_000, U256::zero());
        assert!(result.is_success(), "{:?}", result.error);
        drop(evm);
        // frame 1001 failed and reverted its write
        let count = state.get_storage(&addr(0xc0de), &H256::ZERO).to_word();
        assert_eq!(count, U256::from(1000));
    }

    #[test]
    fn test_atlantis_skips_empty_call_to_missing_account() {
        let mut state = funded_state();
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(ATLANTIS), &rules, &precompiles);

        let result = evm.call(origin(), addr(0xbeef), Bytes::new(), 1_000, U256::zero());
        assert!(result.is_success());
        assert_eq!(result.gas_left, 1_000);
        assert!(!state.exists(&addr(0xbeef)));

        let mut state = funded_state();
        let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);
        evm.call(origin(), addr(0xbeef), Bytes::new(), 1_000, U256::zero());
        assert!(state.exists(&addr(0xbeef)));
    }

    #[test]
    fn test_precompile_call() {
        let mut state = funded_state();
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);

        let input = Bytes::from_static(b"hello");
        let result = evm.call(origin(), addr(4), input.clone(), 100, U256::zero());
        assert_eq!(result.output, input);
        assert_eq!(result.gas_left, 100 - 18);

        let result = evm.call(origin(), addr(4), input, 10, U256::zero());
        assert_eq!(result.error, Some(EvmError::OutOfGas));
        assert_eq!(result.gas_left, 0);
    }

    #[test]
    fn test_create_stores_code_and_bumps_nonce() {
        let mut state = funded_state();
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);

        let result = evm.create(origin(), Bytes::from_static(&ONE_BYTE_INIT), 1_000, U256::from(3));
        assert!(result.is_success());
        let created = result.created.unwrap();
        assert_eq!(created, create_address(&origin(), 0));
        // init code 9, deposit 200
        assert_eq!(result.gas_left, 1_000 - 9 - 200);
        assert_eq!(state.get_code(&created).as_ref(), &[0u8]);
        assert_eq!(state.get_balance(&created), U256::from(3));
        assert_eq!(state.get_nonce(&origin()), 1);
        assert_eq!(state.get_nonce(&created), 0);
    }

    #[test]
    fn test_atlantis_create_starts_nonce_at_one() {
        let mut state = funded_state();
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(ATLANTIS), &rules, &precompiles);

        let result = evm.create(origin(), Bytes::new(), 1_000, U256::zero());
        let created = result.created.unwrap();
        assert_eq!(state.get_nonce(&created), 1);
    }

    #[test]
    fn test_code_store_out_of_gas_frontier_keeps_account() {
        let mut state = funded_state();
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(FRONTIER), &rules, &precompiles);

        let result = evm.create(origin(), Bytes::from_static(&ONE_BYTE_INIT), 109, U256::zero());
        assert_eq!(result.error, Some(EvmError::CodeStoreOutOfGas));
        assert_eq!(result.gas_left, 100);
        let created = result.created.unwrap();
        assert!(state.exists(&created));
        assert!(state.get_code(&created).is_empty());
    }

    #[test]
    fn test_code_store_out_of_gas_homestead_reverts() {
        let mut state = funded_state();
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);

        let result = evm.create(origin(), Bytes::from_static(&ONE_BYTE_INIT), 109, U256::zero());
        assert_eq!(result.error, Some(EvmError::CodeStoreOutOfGas));
        assert_eq!(result.gas_left, 0);
        assert!(!state.exists(&create_address(&origin(), 0)));
        // the nonce bump survives the revert
        assert_eq!(state.get_nonce(&origin()), 1);
    }

    #[test]
    fn test_failed_inner_call_drops_its_logs_and_writes() {
        let mut state = funded_state();
        let inner = addr(0xb);
        let outer = addr(0xa);
        // PUSH1 1 PUSH1 0 SSTORE PUSH1 0 PUSH1 0 LOG0 INVALID
        deploy(&mut state, inner, &[0x60, 0x01, 0x60, 0x00, 0x55, 0x60, 0x00, 0x60, 0x00, 0xa0, 0xfe]);
        let mut code = vec![0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00];
        push20(&mut code, inner);
        // PUSH2 50000 CALL, store the result in slot 0, LOG0, STOP
        code.extend_from_slice(&[0x61, 0xc3, 0x50, 0xf1, 0x60, 0x00, 0x55]);
        code.extend_from_slice(&[0x60, 0x00, 0x60, 0x00, 0xa0, 0x00]);
        deploy(&mut state, outer, &code);

        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);
        let result = evm.call(origin(), outer, Bytes::new(), 200_000, U256::zero());
        assert!(result.is_success());

        let logs = evm.take_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].address, outer);
        assert_eq!(logs[0].block_number, HOMESTEAD);
        assert_eq!(state.get_storage(&inner, &H256::ZERO), H256::ZERO);
        assert_eq!(state.get_storage(&outer, &H256::ZERO), H256::ZERO);
    }

    #[test]
    fn test_delegate_call_keeps_caller_and_value() {
        let mut state = funded_state();
        let library = addr(0xb);
        let proxy = addr(0xa);
        // CALLER PUSH1 0 SSTORE CALLVALUE PUSH1 1 SSTORE
        deploy(&mut state, library, &[0x33, 0x60, 0x00, 0x55, 0x34, 0x60, 0x01, 0x55]);
        let mut code = vec![0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00];
        push20(&mut code, library);
        code.extend_from_slice(&[0x62, 0x01, 0x86, 0xa0, 0xf4, 0x00]);
        deploy(&mut state, proxy, &code);

        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);
        let result = evm.call(origin(), proxy, Bytes::new(), 300_000, U256::from(5));
        assert!(result.is_success());

        let slot = |n: u64| H256::from_word(U256::from(n));
        assert_eq!(state.get_storage(&proxy, &slot(0)), H256::from_word(origin().to_word()));
        assert_eq!(state.get_storage(&proxy, &slot(1)), slot(5));
        assert_eq!(state.get_storage(&library, &slot(0)), H256::ZERO);
        assert_eq!(state.get_balance(&proxy), U256::from(5));
        assert_eq!(state.get_balance(&library), U256::zero());
    }

    #[test]
    fn test_delegate_call_invalid_before_homestead() {
        let mut state = funded_state();
        deploy(&mut state, addr(0xa), &[0xf4]);
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(FRONTIER), &rules, &precompiles);

        let result = evm.call(origin(), addr(0xa), Bytes::new(), 1_000, U256::zero());
        assert_eq!(result.error, Some(EvmError::InvalidOpcode(0xf4)));
        assert_eq!(result.gas_left, 0);
    }

    #[test]
    fn test_suicide_moves_balance_and_refunds_once() {
        let mut state = funded_state();
        let victim = addr(0xa);
        let heir = addr(0xb);
        let mut code = Vec::new();
        push20(&mut code, heir);
        code.push(0xff);
        state.insert_account(victim, U256::from(10), 0, Bytes::from(code), []);

        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);
        assert!(evm.call(origin(), victim, Bytes::new(), 10_000, U256::zero()).is_success());
        assert!(evm.call(origin(), victim, Bytes::new(), 10_000, U256::zero()).is_success());

        assert_eq!(state.get_balance(&heir), U256::from(10));
        assert_eq!(state.get_balance(&victim), U256::zero());
        assert!(state.has_suicided(&victim));
        assert_eq!(state.get_refund(), 24_000);
    }

    #[test]
    fn test_nested_call_forwards_value_with_stipend() {
        let mut state = funded_state();
        let target = addr(0xb);
        let caller = addr(0xa);
        // GAS PUSH1 0 SSTORE: records the gas the callee started with, minus 2
        deploy(&mut state, target, &[0x5a, 0x60, 0x00, 0x55]);
        let mut code = vec![0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x07];
        push20(&mut code, target);
        // PUSH2 30000 CALL
        code.extend_from_slice(&[0x61, 0x75, 0x30, 0xf1, 0x00]);
        state.insert_account(caller, U256::from(100), 0, Bytes::from(code), []);

        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);
        let result = evm.call(origin(), caller, Bytes::new(), 200_000, U256::zero());
        assert!(result.is_success());

        assert_eq!(state.get_balance(&target), U256::from(7));
        assert_eq!(state.get_balance(&caller), U256::from(93));
        let started_with = state.get_storage(&target, &H256::ZERO).to_word();
        assert_eq!(started_with, U256::from(30_000 + 2_300 - 2));
    }

    proptest! {
        #[test]
        fn prop_failed_frame_leaves_no_trace(
            writes in proptest::collection::vec((any::<u64>(), 1u64..u64::MAX), 1..8),
            value in 0u64..1_000,
        ) {
            let mut state = funded_state();
            let target = addr(0xb);
            let mut code = Vec::new();
            for (key, val) in &writes {
                code.push(0x67);
                code.extend_from_slice(&val.to_be_bytes());
                code.push(0x67);
                code.extend_from_slice(&key.to_be_bytes());
                code.push(0x55);
            }
            code.push(0xfe);
            deploy(&mut state, target, &code);

            let rules = ChainConfig::classic_mainnet();
            let precompiles = PrecompileRegistry::standard();
            let mut evm = Evm::new(&mut state, env_at(HOMESTEAD), &rules, &precompiles);
            let result = evm.call(origin(), target, Bytes::new(), 1_000_000, U256::from(value));
            prop_assert_eq!(result.error, Some(EvmError::InvalidOpcode(0xfe)));
            prop_assert_eq!(result.gas_left, 0);
            prop_assert!(evm.logs().is_empty());
            drop(evm);

            prop_assert_eq!(state.get_balance(&origin()), U256::from(1_000_000));
            prop_assert_eq!(state.get_balance(&target), U256::zero());
            prop_assert!(state.storage(&target).is_empty());
            prop_assert_eq!(state.get_refund(), 0);
        }
    }
}
