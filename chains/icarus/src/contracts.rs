//! Contract bindings for the token, swap router and liquidity router.

ethers::contract::abigen!(
    IErc20,
    r#"[
        function balanceOf(address owner) view returns (uint256)
        function approve(address spender, uint256 amount) returns (bool)
        function allowance(address owner, address spender) view returns (uint256)
    ]"#
);

ethers::contract::abigen!(
    ISwapRouter,
    r#"[
        function execute(bytes commands, bytes[] inputs) payable
    ]"#
);

ethers::contract::abigen!(
    ILiquidityRouter,
    r#"[
        function addLiquidity(address tokenA, address tokenB, bool stable, uint256 amountADesired, uint256 amountBDesired, uint256 amountAMin, uint256 amountBMin, address to, uint256 deadline) returns (uint256 amountA, uint256 amountB, uint256 liquidity)
        function quoteAddLiquidity(address tokenA, address tokenB, bool stable, address factory, uint256 amountADesired, uint256 amountBDesired) view returns (uint256 amountA, uint256 amountB, uint256 liquidity)
        function defaultFactory() view returns (address)
        function getReserves(address tokenA, address tokenB, bool stable, address factory) view returns (uint256 reserveA, uint256 reserveB)
    ]"#
);
